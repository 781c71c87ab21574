use gloo_net::http::{Request, Response};
use mofutree_core::protocol::UPLOAD_FIELD;
use mofutree_core::{
    interpret_admin_reply, interpret_upload_reply, AdminAck, ClientError, Endpoints,
    HistoryResponse, RestoreRequest, RollbackRequest, TreeApi, UploadResponse,
};
use wasm_bindgen::JsValue;
use web_sys::{File, FormData};

fn transport(err: gloo_net::Error) -> ClientError {
    ClientError::Transport(err.to_string())
}

fn js_error(err: JsValue) -> ClientError {
    ClientError::Transport(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

/// `fetch`-backed server client. Uploads hand the browser's `File` straight
/// to `FormData`, so the bytes never cross into wasm memory.
#[derive(Clone)]
pub struct BrowserApi {
    endpoints: Endpoints,
}

impl BrowserApi {
    pub fn new(endpoints: Endpoints) -> Self {
        Self { endpoints }
    }

    async fn reply_text(response: Response) -> Result<(u16, String), ClientError> {
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        Ok((status, body))
    }
}

impl TreeApi for BrowserApi {
    type Upload = File;

    async fn upload(&self, file: &File) -> Result<UploadResponse, ClientError> {
        let form = FormData::new().map_err(js_error)?;
        form.append_with_blob_and_filename(UPLOAD_FIELD, file, &file.name())
            .map_err(js_error)?;
        let response = Request::post(self.endpoints.upload().as_str())
            .body(form)
            .map_err(transport)?
            .send()
            .await
            .map_err(transport)?;
        let (status, body) = Self::reply_text(response).await?;
        interpret_upload_reply(status, &body)
    }

    async fn history(&self) -> Result<HistoryResponse, ClientError> {
        let response = Request::get(self.endpoints.history().as_str())
            .send()
            .await
            .map_err(transport)?;
        if !response.ok() {
            return Err(ClientError::Status(response.status()));
        }
        let (_, body) = Self::reply_text(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn restore(&self, request: &RestoreRequest) -> Result<AdminAck, ClientError> {
        let response = Request::post(self.endpoints.restore().as_str())
            .json(request)
            .map_err(transport)?
            .send()
            .await
            .map_err(transport)?;
        let (status, body) = Self::reply_text(response).await?;
        interpret_admin_reply(status, &body)
    }

    async fn rollback(&self, request: &RollbackRequest) -> Result<AdminAck, ClientError> {
        let response = Request::post(self.endpoints.rollback().as_str())
            .json(request)
            .map_err(transport)?
            .send()
            .await
            .map_err(transport)?;
        let (status, body) = Self::reply_text(response).await?;
        interpret_admin_reply(status, &body)
    }
}
