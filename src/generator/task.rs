//! Known ML task kinds and the inputs their UIs must accept.

use anyhow::Result;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputModality {
    Image,
    Text,
    Tabular,
    Audio,
    Zip,
}

impl InputModality {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputModality::Image => "image",
            InputModality::Text => "text",
            InputModality::Tabular => "tabular",
            InputModality::Audio => "audio",
            InputModality::Zip => "zip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    ImageClassification,
    TextClassification,
    TabularClassification,
    TabularRegression,
    MultimodalClassification,
    SemanticSegmentation,
    MultilabelTabularClassification,
}

impl TaskKind {
    pub const ALL: [TaskKind; 7] = [
        TaskKind::ImageClassification,
        TaskKind::TextClassification,
        TaskKind::TabularClassification,
        TaskKind::TabularRegression,
        TaskKind::MultimodalClassification,
        TaskKind::SemanticSegmentation,
        TaskKind::MultilabelTabularClassification,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::ImageClassification => "IMAGE_CLASSIFICATION",
            TaskKind::TextClassification => "TEXT_CLASSIFICATION",
            TaskKind::TabularClassification => "TABULAR_CLASSIFICATION",
            TaskKind::TabularRegression => "TABULAR_REGRESSION",
            TaskKind::MultimodalClassification => "MULTIMODAL_CLASSIFICATION",
            TaskKind::SemanticSegmentation => "SEMANTIC_SEGMENTATION",
            TaskKind::MultilabelTabularClassification => "MULTILABEL_TABULAR_CLASSIFICATION",
        }
    }

    pub fn inputs(&self) -> &'static [InputModality] {
        use InputModality::*;
        match self {
            TaskKind::ImageClassification | TaskKind::SemanticSegmentation => &[Image],
            TaskKind::TextClassification => &[Text],
            TaskKind::TabularClassification
            | TaskKind::TabularRegression
            | TaskKind::MultilabelTabularClassification => &[Tabular],
            TaskKind::MultimodalClassification => &[Audio, Image, Text, Zip],
        }
    }

    /// Comma-separated input list, e.g. "audio, image, text, zip"
    pub fn inputs_label(&self) -> String {
        self.inputs()
            .iter()
            .map(InputModality::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaskKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        TaskKind::ALL
            .into_iter()
            .find(|k| k.name() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = TaskKind::ALL.iter().map(|k| k.name()).collect();
                anyhow::anyhow!("Unknown task kind '{}' (known: {})", s, known.join(", "))
            })
    }
}
