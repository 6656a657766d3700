//! Prompter with canned answers.

use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::domain::ExportFormat;
use crate::usecases::ports::CloseChoice;
use crate::usecases::ports::Notice;
use crate::usecases::ports::Prompter;
use crate::usecases::ports::WindowId;

pub struct MockPrompter {
    use_dockerfile: bool,
    close_choice: Mutex<CloseChoice>,
    export_format: Option<ExportFormat>,
    dockerfile_prompts: AtomicUsize,
    close_prompts: AtomicUsize,
    notices: Mutex<Vec<Notice>>,
}

impl Default for MockPrompter {
    fn default() -> Self {
        Self {
            use_dockerfile: false,
            close_choice: Mutex::new(CloseChoice::Cancel),
            export_format: None,
            dockerfile_prompts: AtomicUsize::new(0),
            close_prompts: AtomicUsize::new(0),
            notices: Mutex::new(Vec::new()),
        }
    }
}

impl MockPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dockerfile(mut self, answer: bool) -> Self {
        self.use_dockerfile = answer;
        self
    }

    pub fn with_close_choice(self, choice: CloseChoice) -> Self {
        self.set_close_choice(choice);
        self
    }

    pub fn with_export_format(mut self, format: Option<ExportFormat>) -> Self {
        self.export_format = format;
        self
    }

    pub fn set_close_choice(&self, choice: CloseChoice) {
        *self.close_choice.lock().unwrap() = choice;
    }

    pub fn dockerfile_prompt_count(&self) -> usize {
        self.dockerfile_prompts.load(Ordering::SeqCst)
    }

    pub fn close_prompt_count(&self) -> usize {
        self.close_prompts.load(Ordering::SeqCst)
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Prompter for MockPrompter {
    fn confirm_dockerfile(&self) -> bool {
        self.dockerfile_prompts.fetch_add(1, Ordering::SeqCst);
        self.use_dockerfile
    }

    fn confirm_close(&self, _window: WindowId) -> CloseChoice {
        self.close_prompts.fetch_add(1, Ordering::SeqCst);
        *self.close_choice.lock().unwrap()
    }

    fn choose_export_format(&self, _window: Option<WindowId>) -> Option<ExportFormat> {
        self.export_format
    }

    fn notify(&self, _window: Option<WindowId>, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}
