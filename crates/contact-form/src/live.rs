//! Live form state
//!
//! Holds the current value of every control while the user interacts with the
//! form. Actions never read it directly: they take a [`FormSnapshot`] first.

use crate::config::QuestionType;
use crate::encoding::SelectedFile;
use crate::error::{FormError, Result};
use crate::form::{Form, Widget};
use crate::markup::Markup;
use std::collections::HashMap;

/// Border indicator of a control after validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Indicator {
    #[default]
    Neutral,
    Failing,
}

/// Live state of all controls, in form order
#[derive(Debug, Clone)]
pub struct LiveForm {
    controls: Vec<LiveControl>,
}

/// One control and its current value
#[derive(Debug, Clone)]
pub struct LiveControl {
    name: String,
    label: Markup,
    kind: QuestionType,
    required: bool,
    value: LiveValue,
    indicator: Indicator,
}

#[derive(Debug, Clone)]
enum LiveValue {
    /// Typed text and the value the control started with
    Text { value: String, initial: String },
    Choice(ChoiceState),
    Files { files: Vec<SelectedFile>, multiple: bool },
}

#[derive(Debug, Clone)]
struct ChoiceState {
    options: Vec<LiveOption>,
    multiple: bool,
    placeholder_listener: Option<PlaceholderListener>,
}

#[derive(Debug, Clone)]
struct LiveOption {
    value: String,
    disabled: bool,
    /// `selected` attribute from the configuration
    default_selected: bool,
    /// Current selectedness
    selected: bool,
}

/// One-shot change listener clearing the initial placeholder selection.
#[derive(Debug, Clone)]
struct PlaceholderListener {
    placeholder: Option<usize>,
}

impl PlaceholderListener {
    /// Consumes the listener so it can never fire twice.
    fn fire(self, options: &mut [LiveOption]) {
        if let Some(option) = self.placeholder.and_then(|i| options.get_mut(i)) {
            option.selected = false;
        }
    }
}

impl ChoiceState {
    fn new(options: &[crate::config::SelectOption], multiple: bool) -> Self {
        let options: Vec<LiveOption> = options
            .iter()
            .map(|o| LiveOption {
                value: o.value.clone(),
                disabled: o.is_disabled(),
                default_selected: o.is_selected(),
                selected: false,
            })
            .collect();
        let placeholder = options
            .iter()
            .position(|o| o.disabled && o.default_selected);

        let mut state = Self {
            options,
            multiple,
            placeholder_listener: Some(PlaceholderListener { placeholder }),
        };
        state.reset();
        state
    }

    /// Restore the configured selection, following the browser's
    /// selectedness rules for single-choice controls.
    fn reset(&mut self) {
        for option in &mut self.options {
            option.selected = option.default_selected;
        }
        if self.multiple {
            return;
        }
        match self.options.iter().rposition(|o| o.selected) {
            Some(last) => {
                for (i, option) in self.options.iter_mut().enumerate() {
                    option.selected = i == last;
                }
            }
            None => {
                if let Some(first) = self.options.iter_mut().find(|o| !o.disabled) {
                    first.selected = true;
                }
            }
        }
    }

    fn selected_values(&self) -> Vec<String> {
        self.options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value.clone())
            .collect()
    }

    fn changed(&mut self, name: &str) {
        if let Some(listener) = self.placeholder_listener.take() {
            listener.fire(&mut self.options);
        }
        let selected = self.options.iter().filter(|o| o.selected).count();
        tracing::debug!(name, selected, "selection changed");
    }
}

impl LiveForm {
    /// Fresh state for a synthesized form
    pub fn new(form: &Form) -> Self {
        let controls = form
            .fields
            .iter()
            .map(|field| {
                let value = match &field.widget {
                    Widget::Select(options) => {
                        LiveValue::Choice(ChoiceState::new(options, field.is_multiple()))
                    }
                    Widget::Input(QuestionType::File) => LiveValue::Files {
                        files: Vec::new(),
                        multiple: field.is_multiple(),
                    },
                    Widget::Input(_) | Widget::TextArea => {
                        let initial = field.attributes.get("value").unwrap_or_default();
                        LiveValue::Text {
                            value: initial.to_string(),
                            initial: initial.to_string(),
                        }
                    }
                };
                LiveControl {
                    name: field.name().to_string(),
                    label: field.label.clone(),
                    kind: field.kind,
                    required: field.is_required(),
                    value,
                    indicator: Indicator::Neutral,
                }
            })
            .collect();
        Self { controls }
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Control lookup; with duplicate names the last control wins.
    fn control_mut(&mut self, name: &str) -> Result<&mut LiveControl> {
        self.controls
            .iter_mut()
            .rev()
            .find(|c| c.name == name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    fn control(&self, name: &str) -> Option<&LiveControl> {
        self.controls.iter().rev().find(|c| c.name == name)
    }

    /// Type into a text-like control
    pub fn set_text(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let control = self.control_mut(name)?;
        match &mut control.value {
            LiveValue::Text { value: text, .. } => {
                *text = value.into();
                Ok(())
            }
            _ => Err(FormError::WrongControl {
                name: name.to_string(),
                expected: "text",
            }),
        }
    }

    /// Select an option. Single-choice controls replace their selection;
    /// multi-choice controls add to it.
    pub fn choose(&mut self, name: &str, value: &str) -> Result<()> {
        let control = self.control_mut(name)?;
        let LiveValue::Choice(choice) = &mut control.value else {
            return Err(FormError::WrongControl {
                name: name.to_string(),
                expected: "a selection",
            });
        };

        let index = choice
            .options
            .iter()
            .position(|o| o.value == value && !o.disabled)
            .ok_or_else(|| FormError::OptionUnavailable {
                name: name.to_string(),
                value: value.to_string(),
            })?;

        if !choice.multiple {
            for option in &mut choice.options {
                option.selected = false;
            }
        }
        choice.options[index].selected = true;
        choice.changed(name);
        Ok(())
    }

    /// Remove an option from a multi-choice selection
    pub fn deselect(&mut self, name: &str, value: &str) -> Result<()> {
        let control = self.control_mut(name)?;
        let LiveValue::Choice(choice) = &mut control.value else {
            return Err(FormError::WrongControl {
                name: name.to_string(),
                expected: "a selection",
            });
        };
        if !choice.multiple {
            return Err(FormError::WrongControl {
                name: name.to_string(),
                expected: "deselection",
            });
        }
        if let Some(option) = choice.options.iter_mut().find(|o| o.value == value) {
            option.selected = false;
        }
        choice.changed(name);
        Ok(())
    }

    /// Pick files for a file control. Single-file controls keep the first.
    pub fn attach_files(&mut self, name: &str, mut selected: Vec<SelectedFile>) -> Result<()> {
        let control = self.control_mut(name)?;
        let LiveValue::Files { files, multiple } = &mut control.value else {
            return Err(FormError::WrongControl {
                name: name.to_string(),
                expected: "files",
            });
        };
        if !*multiple && selected.len() > 1 {
            tracing::warn!(
                name,
                count = selected.len(),
                "control takes a single file, keeping the first"
            );
            selected.truncate(1);
        }
        *files = selected;
        Ok(())
    }

    /// Currently selected option values
    pub fn selected_values(&self, name: &str) -> Option<Vec<String>> {
        match &self.control(name)?.value {
            LiveValue::Choice(choice) => Some(choice.selected_values()),
            _ => None,
        }
    }

    /// Whether the one-shot placeholder listener is still attached
    pub fn has_placeholder_listener(&self, name: &str) -> bool {
        matches!(
            self.control(name).map(|c| &c.value),
            Some(LiveValue::Choice(ChoiceState { placeholder_listener: Some(_), .. }))
        )
    }

    pub fn indicator(&self, name: &str) -> Option<Indicator> {
        self.control(name).map(|c| c.indicator)
    }

    /// Restore every control to its initial value. Listeners that already
    /// fired stay detached.
    pub fn reset(&mut self) {
        for control in &mut self.controls {
            match &mut control.value {
                LiveValue::Text { value, initial } => value.clone_from(initial),
                LiveValue::Choice(choice) => choice.reset(),
                LiveValue::Files { files, .. } => files.clear(),
            }
            control.indicator = Indicator::Neutral;
        }
    }

    /// Copy every control's value at this instant
    pub fn snapshot(&self) -> FormSnapshot {
        let entries = self
            .controls
            .iter()
            .map(|c| SnapshotEntry {
                name: c.name.clone(),
                label: c.label.clone(),
                kind: c.kind,
                required: c.required,
                value: match &c.value {
                    LiveValue::Text { value, .. } => SnapshotValue::Text(value.clone()),
                    LiveValue::Choice(choice) => SnapshotValue::Choice(choice.selected_values()),
                    LiveValue::Files { files, .. } => SnapshotValue::Files(files.clone()),
                },
            })
            .collect();
        FormSnapshot { entries }
    }

    /// Apply indicators computed from a snapshot of this form
    pub(crate) fn apply_indicators(&mut self, indicators: &[Indicator]) {
        for (control, indicator) in self.controls.iter_mut().zip(indicators) {
            control.indicator = *indicator;
        }
    }
}

/// Immutable copy of the form's values, one entry per control
#[derive(Debug, Clone)]
pub struct FormSnapshot {
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub name: String,
    pub label: Markup,
    pub kind: QuestionType,
    pub required: bool,
    pub value: SnapshotValue,
}

#[derive(Debug, Clone)]
pub enum SnapshotValue {
    Text(String),
    /// Selected option values in option order
    Choice(Vec<String>),
    Files(Vec<SelectedFile>),
}

impl FormSnapshot {
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&SnapshotEntry> {
        self.entries.iter().rev().find(|e| e.name == name)
    }

    /// One entry per name: a later control overwrites the value of an earlier
    /// one with the same name but keeps its position.
    pub fn merged_by_name(self) -> Vec<SnapshotEntry> {
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut merged: Vec<SnapshotEntry> = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            match slots.get(&entry.name) {
                Some(&slot) => merged[slot] = entry,
                None => {
                    slots.insert(entry.name.clone(), merged.len());
                    merged.push(entry);
                }
            }
        }
        merged
    }
}
