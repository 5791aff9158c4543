use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::AppError;

/// A file part of a multipart request.
#[derive(Debug)]
pub struct UploadedFile {
    /// Client-supplied filename, untrusted.
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A fully buffered multipart form. Parts with a filename are files, the rest
/// are text fields; later parts with the same name replace earlier ones.
#[derive(Debug, Default)]
pub struct MultipartForm {
    files: HashMap<String, UploadedFile>,
    fields: HashMap<String, String>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            let filename = field.file_name().map(str::to_owned);
            let content_type = field.content_type().map(str::to_owned);

            if filename.is_some() {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                form.files.insert(
                    name,
                    UploadedFile {
                        filename,
                        content_type,
                        data: data.to_vec(),
                    },
                );
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read field: {e}")))?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    /// Remove and return the file part `name`, or `FILE_REQUIRED`.
    pub fn take_file(&mut self, name: &str) -> Result<UploadedFile, AppError> {
        self.files
            .remove(name)
            .ok_or_else(|| AppError::bad_request("FILE_REQUIRED", format!("Missing '{name}' file")))
    }

    /// Text value of `name`. A JSON document uploaded as a file part counts too.
    pub fn take_text(&mut self, name: &str) -> Result<Option<String>, AppError> {
        if let Some(text) = self.fields.remove(name) {
            return Ok(Some(text));
        }
        match self.files.remove(name) {
            Some(file) => String::from_utf8(file.data)
                .map(Some)
                .map_err(|_| AppError::Validation(format!("'{name}' must be UTF-8 text"))),
            None => Ok(None),
        }
    }
}
