//! Parent-Mode library client
//!
//! Client side of the backend course-material endpoints: upload a PDF,
//! list uploaded books, fetch extracted content. The listing is whatever
//! the backend returns; nothing is cached or persisted locally.

use std::path::Path;

use crate::{Error, Result};

/// Receipt returned by a successful upload
#[derive(Debug, serde::Deserialize)]
pub struct UploadReceipt {
    /// Human-readable confirmation
    pub message: String,

    /// Id assigned to the uploaded book
    pub id: u64,
}

/// Book id and display name, as returned by `GET /book-names`
#[derive(Debug, Clone, serde::Deserialize)]
pub struct BookName {
    /// Backend-assigned book id
    pub id: u64,

    /// Display name (first line of the extracted text)
    pub name: String,
}

/// Full book record, as returned by `GET /all-books`
#[derive(Debug, serde::Deserialize)]
pub struct Book {
    /// Backend-assigned book id
    pub id: u64,

    /// Display name
    pub name: String,

    /// Extracted text content
    #[serde(default)]
    pub content: String,

    /// Generated summary, empty until the backend produces one
    #[serde(default)]
    pub summary: String,

    /// Quizzes generated from this book
    #[serde(default)]
    pub quizzes: Vec<serde_json::Value>,

    /// Recorded quiz attempts
    #[serde(default)]
    pub attempts: Vec<serde_json::Value>,
}

/// Wire shape of `GET /book/<id>`
#[derive(serde::Deserialize)]
struct BookContentReply {
    content: String,
}

/// HTTP client for the backend library endpoints
pub struct LibraryClient {
    client: reqwest::Client,
    base_url: String,
}

impl LibraryClient {
    /// Create a client against the given backend base URL
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Upload a PDF as course material
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or the upload fails
    pub async fn upload_book(&self, path: &Path) -> Result<UploadReceipt> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload.pdf".to_string(), |n| n.to_string_lossy().into_owned());

        tracing::info!(file = %file_name, bytes = bytes.len(), "uploading book");

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| Error::Backend(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/upload-book", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "upload request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "upload rejected");
            return Err(Error::Backend(format!("upload error {status}: {body}")));
        }

        let receipt: UploadReceipt = response.json().await?;
        tracing::info!(id = receipt.id, "book uploaded");
        Ok(receipt)
    }

    /// List the ids and names of all uploaded books
    ///
    /// # Errors
    ///
    /// Returns error if the listing request fails
    pub async fn book_names(&self) -> Result<Vec<BookName>> {
        let response = self
            .client
            .get(format!("{}/book-names", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Backend(format!("book listing error {status}")));
        }

        Ok(response.json().await?)
    }

    /// Fetch the extracted text content of one book
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or another error if
    /// the request fails
    pub async fn book_content(&self, id: u64) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/book/{id}", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("book {id}")));
        }
        if !status.is_success() {
            return Err(Error::Backend(format!("book fetch error {status}")));
        }

        let reply: BookContentReply = response.json().await?;
        Ok(reply.content)
    }

    /// Fetch every book record, including quizzes and attempts
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    pub async fn all_books(&self) -> Result<Vec<Book>> {
        let response = self
            .client
            .get(format!("{}/all-books", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Backend(format!("book listing error {status}")));
        }

        Ok(response.json().await?)
    }
}
