use std::time::Duration;

use mofutree_core::protocol::UPLOAD_FIELD;
use mofutree_core::{
    interpret_admin_reply, interpret_upload_reply, AdminAck, AssetReference, ClientError,
    Endpoints, HistoryResponse, RestoreRequest, RollbackRequest, TreeApi, UploadFile,
    UploadResponse,
};
use reqwest::multipart::{Form, Part};
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
// Generation runs inside the upload request and can take minutes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

fn transport(err: reqwest::Error) -> ClientError {
    ClientError::Transport(err.to_string())
}

/// Tree server client over `reqwest`.
#[derive(Clone)]
pub struct HttpTreeApi {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpTreeApi {
    pub fn new(endpoints: Endpoints) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(transport)?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Fetches the composite as currently addressed by `asset`.
    pub async fn download(&self, asset: &AssetReference) -> Result<Vec<u8>, ClientError> {
        let url = Url::parse(&asset.current_uri())?;
        self.fetch_bytes(url).await
    }

    pub async fn download_history_image(&self, filename: &str) -> Result<Vec<u8>, ClientError> {
        self.fetch_bytes(self.endpoints.history_image(filename)).await
    }

    async fn fetch_bytes(&self, url: Url) -> Result<Vec<u8>, ClientError> {
        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }

    async fn post_admin<T: serde::Serialize>(
        &self,
        url: Url,
        request: &T,
    ) -> Result<AdminAck, ClientError> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;
        interpret_admin_reply(status, &body)
    }
}

impl TreeApi for HttpTreeApi {
    type Upload = UploadFile;

    async fn upload(&self, file: &UploadFile) -> Result<UploadResponse, ClientError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(transport)?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        tracing::debug!(name = %file.name, size = file.bytes.len(), "uploading decoration");
        let response = self
            .client
            .post(self.endpoints.upload())
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;
        interpret_upload_reply(status, &body)
    }

    async fn history(&self) -> Result<HistoryResponse, ClientError> {
        let response = self
            .client
            .get(self.endpoints.history())
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        let body = response.text().await.map_err(transport)?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn restore(&self, request: &RestoreRequest) -> Result<AdminAck, ClientError> {
        self.post_admin(self.endpoints.restore(), request).await
    }

    async fn rollback(&self, request: &RollbackRequest) -> Result<AdminAck, ClientError> {
        self.post_admin(self.endpoints.rollback(), request).await
    }
}
