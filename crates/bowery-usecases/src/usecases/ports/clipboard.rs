pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str);
}
