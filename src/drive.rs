use crate::drive::models::{Created, File, FileList, Metadata};
use crate::session::SessionRecord;
use crate::sync::{Candidate, Download, Remote};
use crate::token;
use anyhow::Context;
use rand::distributions::Alphanumeric;
use rand::Rng;

pub mod models;

pub const HISTORY_FILE: &str = "stopwatch-history.json";
const JSON: &str = "application/json";

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

/// A Google Drive client scoped to the files this application creates.
pub struct Client {
    oauth: token::Client,
    http: reqwest::blocking::Client,
}

impl Client {
    pub fn new(oauth: token::Client) -> Client {
        let http = reqwest::blocking::Client::new();
        Client { oauth, http }
    }

    pub fn search(&mut self, name: &str) -> anyhow::Result<FileList> {
        let query = format!("name=\"{name}\" and trashed=false");

        Ok(self
            .http
            .get(FILES_URL)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name,modifiedTime)"),
                ("orderBy", "modifiedTime desc"),
            ])
            .header("Authorization", self.oauth.authorization()?)
            .send()?
            .error_for_status()?
            .json()?)
    }

    pub fn create(&mut self, metadata: &Metadata, content: &str) -> anyhow::Result<Created> {
        let (content_type, body) = related_body(metadata, content)?;

        Ok(self
            .http
            .post(UPLOAD_URL)
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header("Authorization", self.oauth.authorization()?)
            .header("Content-Type", content_type)
            .body(body)
            .send()?
            .error_for_status()?
            .json()?)
    }

    pub fn update(&mut self, id: &str, metadata: &Metadata, content: &str) -> anyhow::Result<Created> {
        let (content_type, body) = related_body(metadata, content)?;

        Ok(self
            .http
            .patch(format!("{UPLOAD_URL}/{id}"))
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header("Authorization", self.oauth.authorization()?)
            .header("Content-Type", content_type)
            .body(body)
            .send()?
            .error_for_status()?
            .json()?)
    }

    pub fn content(&mut self, id: &str) -> anyhow::Result<String> {
        Ok(self
            .http
            .get(format!("{FILES_URL}/{id}"))
            .query(&[("alt", "media")])
            .header("Authorization", self.oauth.authorization()?)
            .send()?
            .error_for_status()?
            .text()?)
    }

    fn candidate(&mut self, file: File) -> anyhow::Result<Candidate> {
        let content = self.content(&file.id)?;

        Ok(Candidate {
            id: file.id,
            modified: file.modified_time,
            content,
        })
    }
}

impl Remote for Client {
    fn upload(&mut self, records: &[SessionRecord]) -> anyhow::Result<()> {
        let content = serde_json::to_string(records)?;
        let metadata = Metadata {
            name: HISTORY_FILE.to_string(),
            mime_type: JSON.to_string(),
        };

        let existing = self.search(HISTORY_FILE)?.files;
        let created = match existing.first() {
            Some(file) => self.update(&file.id, &metadata, &content)?,
            None => self.create(&metadata, &content)?,
        };

        tracing::info!(id = %created.id, records = records.len(), "uploaded history to Drive");

        Ok(())
    }

    fn download(&mut self) -> anyhow::Result<Download> {
        let mut files = self.search(HISTORY_FILE)?.files;
        if files.len() > 2 {
            tracing::warn!(files = files.len(), "more than two remote history files, comparing the newest two");
            files.truncate(2);
        }

        let mut files = files.into_iter();
        match (files.next(), files.next()) {
            (None, _) => Ok(Download::NotFound),
            (Some(file), None) => {
                let content = self.content(&file.id)?;
                let records = serde_json::from_str(&content)
                    .context("Remote history is not a valid session list")?;
                Ok(Download::Success(records))
            }
            (Some(first), Some(second)) => {
                Ok(Download::Conflict(self.candidate(first)?, self.candidate(second)?))
            }
        }
    }
}

/// Builds a `multipart/related` upload body: JSON metadata, then the content.
fn related_body(metadata: &Metadata, content: &str) -> anyhow::Result<(String, String)> {
    let boundary: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    let metadata = serde_json::to_string(metadata)?;

    let body = format!(
        "--{boundary}\r\nContent-Type: {JSON}; charset=UTF-8\r\n\r\n{metadata}\r\n\
         --{boundary}\r\nContent-Type: {JSON}\r\n\r\n{content}\r\n\
         --{boundary}--\r\n"
    );

    Ok((format!("multipart/related; boundary={boundary}"), body))
}
