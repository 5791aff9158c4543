mod common;
mod permission;
mod testdata;
