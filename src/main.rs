#[cfg(target_arch = "wasm32")]
fn main() {
    if let Err(err) = mofutree::boot() {
        gloo::console::error!("failed to start", err);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    eprintln!("mofutree runs in the browser; use mofutree-cli on the command line");
}
