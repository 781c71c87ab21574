use std::cell::RefCell;
use std::rc::Rc;

use gloo::events::EventListener;
use mofutree_core::{AdminView, AssetReference, HistoryEntry, UploadView};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, File, HtmlAnchorElement, HtmlButtonElement, HtmlElement, HtmlFormElement,
    HtmlImageElement, HtmlInputElement, Url,
};

const SUBMIT_LABEL: &str = "Add Decoration";
const SUBMIT_BUSY_LABEL: &str = "Decorating...";

fn by_id<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing #{id}")))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("#{id} has an unexpected element type")))
}

/// Binding of the static markup in `index.html`.
pub struct DomView {
    document: Document,
    tree_image: HtmlImageElement,
    download_link: HtmlAnchorElement,
    loading_overlay: HtmlElement,
    pub upload_form: HtmlFormElement,
    pub file_input: HtmlInputElement,
    preview: HtmlImageElement,
    preview_url: RefCell<Option<String>>,
    upload_button: HtmlButtonElement,
    upload_status: HtmlElement,
    admin_panel: HtmlElement,
    admin_loading: HtmlElement,
    history_grid: HtmlElement,
    pub undo_button: HtmlButtonElement,
    pub admin_close: HtmlButtonElement,
    restore_listeners: RefCell<Vec<EventListener>>,
    on_restore: RefCell<Option<Rc<dyn Fn(String)>>>,
}

impl DomView {
    pub fn bind(document: &Document) -> Result<Self, JsValue> {
        Ok(Self {
            document: document.clone(),
            tree_image: by_id(document, "tree-image")?,
            download_link: by_id(document, "download-link")?,
            loading_overlay: by_id(document, "loading-overlay")?,
            upload_form: by_id(document, "upload-form")?,
            file_input: by_id(document, "file-input")?,
            preview: by_id(document, "preview-image")?,
            preview_url: RefCell::new(None),
            upload_button: by_id(document, "upload-button")?,
            upload_status: by_id(document, "upload-status")?,
            admin_panel: by_id(document, "admin-panel")?,
            admin_loading: by_id(document, "admin-loading")?,
            history_grid: by_id(document, "history-grid")?,
            undo_button: by_id(document, "undo-button")?,
            admin_close: by_id(document, "admin-close")?,
            restore_listeners: RefCell::new(Vec::new()),
            on_restore: RefCell::new(None),
        })
    }

    pub fn set_on_restore(&self, handler: Rc<dyn Fn(String)>) {
        *self.on_restore.borrow_mut() = Some(handler);
    }

    pub fn render_asset(&self, asset: &AssetReference) {
        let uri = asset.current_uri();
        self.tree_image.set_src(&uri);
        self.download_link.set_href(&uri);
        self.download_link.set_download(&asset.download_filename());
    }

    pub fn show_preview(&self, file: Option<&File>) {
        self.release_preview();
        let Some(file) = file else {
            self.preview.set_hidden(true);
            return;
        };
        match Url::create_object_url_with_blob(file) {
            Ok(url) => {
                self.preview.set_src(&url);
                self.preview.set_hidden(false);
                *self.preview_url.borrow_mut() = Some(url);
            }
            Err(err) => gloo::console::warn!("preview unavailable", err),
        }
    }

    pub fn render_upload(&self, view: &UploadView) {
        self.loading_overlay.set_hidden(!view.loading);
        self.upload_button.set_disabled(!view.can_submit());
        self.upload_button.set_text_content(Some(if view.loading {
            SUBMIT_BUSY_LABEL
        } else {
            SUBMIT_LABEL
        }));

        match &view.status {
            Some(status) => {
                self.upload_status.set_text_content(Some(&status.to_string()));
                let _ = self
                    .upload_status
                    .class_list()
                    .toggle_with_force("error", status.is_failure());
                self.upload_status.set_hidden(false);
            }
            None => {
                self.upload_status.set_text_content(None);
                self.upload_status.set_hidden(true);
            }
        }

        if !view.has_selection && self.preview_url.borrow().is_some() {
            self.file_input.set_value("");
            self.show_preview(None);
        }
    }

    pub fn render_admin(&self, view: &AdminView, image_uri: &dyn Fn(&HistoryEntry) -> String) {
        self.admin_panel.set_hidden(!view.active);
        self.admin_loading.set_hidden(!view.loading);
        self.history_grid.set_hidden(view.loading);

        self.restore_listeners.borrow_mut().clear();
        self.history_grid.set_inner_html("");
        if !view.active {
            return;
        }
        let mut listeners = Vec::with_capacity(view.entries.len());
        for entry in &view.entries {
            match self.history_card(entry, &image_uri(entry)) {
                Ok((card, listener)) => {
                    let _ = self.history_grid.append_child(&card);
                    listeners.push(listener);
                }
                Err(err) => gloo::console::warn!("failed to render history entry", err),
            }
        }
        *self.restore_listeners.borrow_mut() = listeners;
    }

    pub fn alert(&self, message: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(message);
        }
    }

    fn history_card(
        &self,
        entry: &HistoryEntry,
        image_uri: &str,
    ) -> Result<(Element, EventListener), JsValue> {
        let card = self.document.create_element("div")?;
        card.set_class_name("history-item");

        let image = self.document.create_element("img")?;
        image.set_attribute("src", image_uri)?;
        image.set_attribute("alt", &entry.filename)?;
        card.append_child(&image)?;

        if entry.is_current() {
            let badge = self.document.create_element("span")?;
            badge.set_class_name("badge-current");
            badge.set_text_content(Some("CURRENT"));
            card.append_child(&badge)?;
        }

        let label = self.document.create_element("p")?;
        label.set_class_name("history-name");
        label.set_attribute("title", &entry.filename)?;
        label.set_text_content(Some(&entry.filename));
        card.append_child(&label)?;

        let button = self.document.create_element("button")?;
        button.set_attribute("type", "button")?;
        button.set_text_content(Some("Restore This Version"));
        card.append_child(&button)?;

        let filename = entry.filename.clone();
        let handler = self.on_restore.borrow().clone();
        let listener = EventListener::new(&button, "click", move |_event| {
            if let Some(handler) = handler.as_ref() {
                handler(filename.clone());
            }
        });
        Ok((card, listener))
    }

    fn release_preview(&self) {
        if let Some(url) = self.preview_url.borrow_mut().take() {
            let _ = Url::revoke_object_url(&url);
        }
    }
}
