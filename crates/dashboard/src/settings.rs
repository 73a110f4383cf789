//! Settings form and its bridge to the backend.
//!
//! The form holds one field per settings key. Loading copies a settings
//! object into matching fields; saving serializes every field back into
//! one object. Checkboxes map to booleans, multi-line fields to lists of
//! non-empty lines, everything else to the raw text.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use etx_client::DashboardBackend;
use etx_core::error::CoreError;
use etx_core::settings::{
    parse_settings_text, render_settings_text, split_lines, SettingValue, Settings,
};

use crate::error::DashboardResult;
use crate::screen::Screen;

pub const SAVED_MESSAGE: &str = "Saved";

/// How a field is edited and serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Text that presenters mask.
    Password,
    Checkbox,
    /// Newline-delimited list.
    MultiLine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub kind: FieldKind,
    pub text: String,
    pub checked: bool,
}

impl FormField {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            text: String::new(),
            checked: false,
        }
    }

    /// Copy `value` into the field according to its kind.
    pub fn apply(&mut self, value: &SettingValue) {
        match self.kind {
            FieldKind::Checkbox => self.checked = value.is_truthy(),
            FieldKind::Text | FieldKind::Password | FieldKind::MultiLine => {
                self.text = value.to_field_text()
            }
        }
    }

    pub fn value(&self) -> SettingValue {
        match self.kind {
            FieldKind::Checkbox => SettingValue::Bool(self.checked),
            FieldKind::MultiLine => SettingValue::List(split_lines(&self.text)),
            FieldKind::Text | FieldKind::Password => SettingValue::Text(self.text.clone()),
        }
    }
}

/// Fields of the ETX settings file, in file order.
const ETX_FIELDS: [(&str, FieldKind); 11] = [
    ("GITHUB_ZIP_URL", FieldKind::Text),
    ("ZIP_PATH", FieldKind::Text),
    ("UNZIP_DIR", FieldKind::Text),
    ("LOCAL_TARGET_DIR", FieldKind::Text),
    ("DELETE_FILES", FieldKind::Checkbox),
    ("REMOTE_HOST", FieldKind::Text),
    ("REMOTE_PORT", FieldKind::Text),
    ("REMOTE_USER", FieldKind::Text),
    ("REMOTE_PASS", FieldKind::Password),
    ("REMOTE_TARGET_DIR", FieldKind::Text),
    ("REMOTE_COMMANDS", FieldKind::MultiLine),
];

/// The settings form: an ordered list of named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsForm {
    pub fields: Vec<FormField>,
}

impl Default for SettingsForm {
    fn default() -> Self {
        Self::etx_default()
    }
}

impl SettingsForm {
    pub fn new(fields: Vec<FormField>) -> Self {
        Self { fields }
    }

    /// Empty form with the ETX settings fields.
    pub fn etx_default() -> Self {
        Self::new(
            ETX_FIELDS
                .iter()
                .map(|(name, kind)| FormField::new(*name, *kind))
                .collect(),
        )
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FormField> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn set_text(&mut self, name: &str, text: impl Into<String>) -> Result<(), CoreError> {
        let field = self.require(name)?;
        if field.kind == FieldKind::Checkbox {
            return Err(CoreError::Validation(format!("{name} is a checkbox")));
        }
        field.text = text.into();
        Ok(())
    }

    pub fn set_checked(&mut self, name: &str, checked: bool) -> Result<(), CoreError> {
        let field = self.require(name)?;
        if field.kind != FieldKind::Checkbox {
            return Err(CoreError::Validation(format!("{name} is not a checkbox")));
        }
        field.checked = checked;
        Ok(())
    }

    /// Copy matching keys into fields. Unknown keys are ignored and
    /// fields without a key keep their value. Returns the number of
    /// fields filled.
    pub fn apply(&mut self, settings: &Settings) -> usize {
        let mut filled = 0;
        for field in &mut self.fields {
            if let Some(value) = settings.get(&field.name) {
                field.apply(value);
                filled += 1;
            }
        }
        filled
    }

    /// Every field as one settings object, in form order.
    pub fn serialize(&self) -> Settings {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.value()))
            .collect()
    }

    fn require(&mut self, name: &str) -> Result<&mut FormField, CoreError> {
        self.field_mut(name)
            .ok_or_else(|| CoreError::Validation(format!("unknown settings field '{name}'")))
    }
}

/// Moves settings between the backend and the form on the [`Screen`].
#[derive(Clone)]
pub struct SettingsBridge {
    backend: Arc<dyn DashboardBackend>,
    screen: Screen,
    confirm_delay: Duration,
    /// Bumped on every confirmation; a clear only applies to its own.
    confirm_generation: Arc<Mutex<u64>>,
}

impl SettingsBridge {
    pub fn new(
        backend: Arc<dyn DashboardBackend>,
        screen: Screen,
        confirm_delay: Duration,
    ) -> Self {
        Self {
            backend,
            screen,
            confirm_delay,
            confirm_generation: Arc::new(Mutex::new(0)),
        }
    }

    /// Fill the form from `GET /settings_json`.
    pub async fn load(&self) -> DashboardResult<usize> {
        let settings = self.backend.load_settings().await?;
        let filled = self.screen.update_settings_form(|form| form.apply(&settings));
        tracing::debug!(keys = settings.len(), filled, "Settings loaded");
        Ok(filled)
    }

    /// Fill the form from the legacy `GET /settings` text.
    pub async fn load_legacy(&self) -> DashboardResult<usize> {
        let text = self.backend.load_settings_text().await?;
        let settings = parse_settings_text(&text)?;
        Ok(self.screen.update_settings_form(|form| form.apply(&settings)))
    }

    /// Post the whole form to `/settings_json`.
    ///
    /// On success shows [`SAVED_MESSAGE`] for the confirm delay.
    pub async fn save(&self) -> DashboardResult<bool> {
        let settings = self.screen.settings_form().serialize();
        let saved = self.backend.save_settings(&settings).await?;
        self.after_save(saved);
        Ok(saved)
    }

    /// Post the form as settings text to the legacy `/settings` endpoint.
    pub async fn save_legacy(&self) -> DashboardResult<bool> {
        let text = render_settings_text(&self.screen.settings_form().serialize());
        let saved = self.backend.save_settings_text(&text).await?;
        self.after_save(saved);
        Ok(saved)
    }

    /// Fill the form from a settings text file on disk.
    pub fn import_file(&self, path: &Path) -> DashboardResult<usize> {
        let text = std::fs::read_to_string(path)?;
        let settings = parse_settings_text(&text)?;
        Ok(self.screen.update_settings_form(|form| form.apply(&settings)))
    }

    /// Fill the form from a JSON settings object on disk.
    pub fn import_json_file(&self, path: &Path) -> DashboardResult<usize> {
        let text = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&text)?;
        Ok(self.screen.update_settings_form(|form| form.apply(&settings)))
    }

    /// Write the form to disk in the settings text format.
    pub fn export_file(&self, path: &Path) -> DashboardResult<()> {
        let text = render_settings_text(&self.screen.settings_form().serialize());
        std::fs::write(path, text)?;
        tracing::info!(path = %path.display(), "Settings exported");
        Ok(())
    }

    fn after_save(&self, saved: bool) {
        if !saved {
            tracing::warn!("Backend did not confirm the settings save");
            return;
        }

        let generation = {
            let mut current = self
                .confirm_generation
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *current += 1;
            self.screen.set_settings_status(SAVED_MESSAGE);
            *current
        };

        let screen = self.screen.clone();
        let confirm_generation = Arc::clone(&self.confirm_generation);
        let delay = self.confirm_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let current = confirm_generation
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *current == generation {
                screen.set_settings_status(String::new());
            }
        });
    }
}
