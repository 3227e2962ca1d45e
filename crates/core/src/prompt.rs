//! Built-in prompt templates and `{name}` placeholder substitution.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::PromptError;

/// Template key that renders to an empty prompt.
pub const NO_TEMPLATE: &str = "none";

/// Output for a template key the library does not know.
pub const TEMPLATE_NOT_FOUND: &str = "Template not found";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterKind {
    Select { choices: Vec<String> },
    Text { multiline: bool },
    Integer { min: i64, max: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Text(String),
    Integer(i64),
}

impl ParameterValue {
    pub fn render(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateParameter {
    pub name: String,
    pub label: String,
    pub kind: ParameterKind,
    pub default: ParameterValue,
}

impl TemplateParameter {
    fn select(name: &str, label: &str, default: &str, choices: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: ParameterKind::Select {
                choices: choices.iter().map(|c| c.to_string()).collect(),
            },
            default: ParameterValue::Text(default.to_string()),
        }
    }

    fn text(name: &str, label: &str, default: &str, multiline: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: ParameterKind::Text { multiline },
            default: ParameterValue::Text(default.to_string()),
        }
    }

    fn integer(name: &str, label: &str, default: i64, min: i64, max: i64) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: ParameterKind::Integer { min, max },
            default: ParameterValue::Integer(default),
        }
    }

    pub fn placeholder(&self) -> String {
        format!("{{{}}}", self.name)
    }

    /// Check a caller-supplied value against this parameter's kind.
    pub fn validate(&self, value: &str) -> Result<(), PromptError> {
        match &self.kind {
            ParameterKind::Text { .. } => Ok(()),
            ParameterKind::Select { choices } if choices.iter().any(|c| c == value) => Ok(()),
            ParameterKind::Select { choices } => Err(PromptError::InvalidChoice {
                name: self.name.clone(),
                value: value.to_string(),
                choices: choices.clone(),
            }),
            ParameterKind::Integer { min, max } => {
                let parsed: i64 = value.trim().parse().map_err(|_| PromptError::NotAnInteger {
                    name: self.name.clone(),
                    value: value.to_string(),
                })?;
                if (*min..=*max).contains(&parsed) {
                    Ok(())
                } else {
                    Err(PromptError::OutOfRange {
                        name: self.name.clone(),
                        value: parsed,
                        min: *min,
                        max: *max,
                    })
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptTemplate {
    pub key: String,
    pub name: String,
    pub text: String,
    pub parameters: Vec<TemplateParameter>,
}

impl PromptTemplate {
    pub fn parameter(&self, name: &str) -> Option<&TemplateParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Substitute each parameter's placeholder with its supplied value, or its
    /// default when absent. Placeholders without a parameter stay verbatim.
    pub fn render(&self, values: &HashMap<String, String>) -> String {
        self.parameters.iter().fold(self.text.clone(), |text, param| {
            let value = values
                .get(&param.name)
                .cloned()
                .unwrap_or_else(|| param.default.render());
            text.replace(&param.placeholder(), &value)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateSummary {
    pub name: String,
    pub label: String,
}

/// Ordered collection of templates addressed by key.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: Vec<PromptTemplate>,
}

impl TemplateLibrary {
    pub fn new(templates: Vec<PromptTemplate>) -> Self {
        Self { templates }
    }

    pub fn builtin() -> Self {
        Self::new(builtin_templates())
    }

    pub fn get(&self, key: &str) -> Option<&PromptTemplate> {
        self.templates.iter().find(|t| t.key == key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.templates.iter().map(|t| t.key.as_str()).collect()
    }

    pub fn list(&self) -> Vec<TemplateSummary> {
        self.templates
            .iter()
            .map(|t| TemplateSummary {
                name: t.key.clone(),
                label: t.name.clone(),
            })
            .collect()
    }

    /// Keys accepted by [`render_prompt`], including [`NO_TEMPLATE`].
    pub fn selectable_keys(&self) -> Vec<String> {
        std::iter::once(NO_TEMPLATE)
            .chain(self.keys())
            .map(str::to_string)
            .collect()
    }
}

/// Render `template_key` from `library`.
///
/// `"none"` renders an empty prompt and an unknown key renders
/// [`TEMPLATE_NOT_FOUND`]; neither is an error.
pub fn render_prompt(
    library: &TemplateLibrary,
    template_key: &str,
    values: &HashMap<String, String>,
) -> String {
    if template_key == NO_TEMPLATE {
        return String::new();
    }
    match library.get(template_key) {
        Some(template) => template.render(values),
        None => TEMPLATE_NOT_FOUND.to_string(),
    }
}

pub fn builtin_templates() -> Vec<PromptTemplate> {
    vec![
        PromptTemplate {
            key: "character".to_string(),
            name: "Character Template".to_string(),
            text: "A {character_type} character named {name}, {age} years old, with {appearance} appearance and {personality} personality. {special_abilities}".to_string(),
            parameters: vec![
                TemplateParameter::select(
                    "character_type",
                    "Character Type",
                    "warrior",
                    &["warrior", "mage", "rogue", "cleric", "bard"],
                ),
                TemplateParameter::text("name", "Character Name", "Aragorn", false),
                TemplateParameter::integer("age", "Age", 25, 1, 1000),
                TemplateParameter::text("appearance", "Appearance", "tall and strong", true),
                TemplateParameter::select(
                    "personality",
                    "Personality",
                    "brave",
                    &["brave", "cunning", "wise", "charismatic", "mysterious"],
                ),
                TemplateParameter::text(
                    "special_abilities",
                    "Special Abilities",
                    "Expert swordsman",
                    false,
                ),
            ],
        },
        PromptTemplate {
            key: "scene".to_string(),
            name: "Scene Template".to_string(),
            text: "A {scene_type} scene set in {location} during {time_of_day}. The atmosphere is {mood} with {lighting} lighting. {weather_condition} {additional_details}".to_string(),
            parameters: vec![
                TemplateParameter::select(
                    "scene_type",
                    "Scene Type",
                    "dramatic",
                    &["dramatic", "peaceful", "action", "romantic", "mysterious"],
                ),
                TemplateParameter::text("location", "Location", "ancient forest", false),
                TemplateParameter::select(
                    "time_of_day",
                    "Time of Day",
                    "sunset",
                    &["dawn", "morning", "noon", "afternoon", "sunset", "night", "midnight"],
                ),
                TemplateParameter::select(
                    "mood",
                    "Mood",
                    "serene",
                    &["serene", "tense", "joyful", "melancholic", "ominous"],
                ),
                TemplateParameter::select(
                    "lighting",
                    "Lighting",
                    "soft",
                    &["soft", "harsh", "dramatic", "natural", "artificial"],
                ),
                TemplateParameter::text("weather_condition", "Weather", "Clear skies", false),
                TemplateParameter::text("additional_details", "Additional Details", "", true),
            ],
        },
        PromptTemplate {
            key: "style".to_string(),
            name: "Art Style Template".to_string(),
            text: "{art_style} style artwork with {color_palette} colors, {composition} composition, {technique} technique. Quality: {quality_level}".to_string(),
            parameters: vec![
                TemplateParameter::select(
                    "art_style",
                    "Art Style",
                    "photorealistic",
                    &[
                        "photorealistic",
                        "digital art",
                        "oil painting",
                        "watercolor",
                        "sketch",
                        "anime",
                        "cartoon",
                    ],
                ),
                TemplateParameter::select(
                    "color_palette",
                    "Color Palette",
                    "vibrant",
                    &["vibrant", "muted", "monochrome", "warm tones", "cool tones", "pastel"],
                ),
                TemplateParameter::select(
                    "composition",
                    "Composition",
                    "centered",
                    &["centered", "rule of thirds", "golden ratio", "dynamic", "symmetrical"],
                ),
                TemplateParameter::text("technique", "Technique", "highly detailed", false),
                TemplateParameter::select(
                    "quality_level",
                    "Quality",
                    "masterpiece",
                    &["draft", "good", "high quality", "masterpiece", "award winning"],
                ),
            ],
        },
        PromptTemplate {
            key: "custom".to_string(),
            name: "Custom Template".to_string(),
            text: "{custom_prompt}".to_string(),
            parameters: vec![TemplateParameter::text(
                "custom_prompt",
                "Custom Prompt",
                "Your custom prompt here...",
                true,
            )],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn builtin_library_lists_templates_in_order() {
        let library = TemplateLibrary::builtin();
        assert_eq!(library.keys(), vec!["character", "scene", "style", "custom"]);
        assert_eq!(
            library.list()[2],
            TemplateSummary {
                name: "style".to_string(),
                label: "Art Style Template".to_string(),
            }
        );
        assert_eq!(
            library.selectable_keys(),
            vec!["none", "character", "scene", "style", "custom"]
        );
    }

    #[test]
    fn none_renders_empty_prompt() {
        let library = TemplateLibrary::builtin();
        assert_eq!(render_prompt(&library, "none", &HashMap::new()), "");
    }

    #[test]
    fn unknown_template_renders_not_found() {
        let library = TemplateLibrary::builtin();
        assert_eq!(
            render_prompt(&library, "landscape", &HashMap::new()),
            "Template not found"
        );
    }

    #[test]
    fn defaults_fill_every_placeholder() {
        let library = TemplateLibrary::builtin();
        assert_eq!(
            render_prompt(&library, "character", &HashMap::new()),
            "A warrior character named Aragorn, 25 years old, with tall and strong appearance \
             and brave personality. Expert swordsman"
        );
        assert_eq!(
            render_prompt(&library, "custom", &HashMap::new()),
            "Your custom prompt here..."
        );
    }

    #[test]
    fn supplied_values_override_defaults() {
        let library = TemplateLibrary::builtin();
        let rendered = render_prompt(
            &library,
            "style",
            &values(&[("art_style", "anime"), ("technique", "cel shaded")]),
        );
        assert_eq!(
            rendered,
            "anime style artwork with vibrant colors, centered composition, cel shaded technique. \
             Quality: masterpiece"
        );
    }

    #[test]
    fn empty_default_leaves_trailing_space() {
        let library = TemplateLibrary::builtin();
        let rendered = render_prompt(&library, "scene", &HashMap::new());
        assert!(rendered.ends_with("Clear skies "));
    }

    #[test]
    fn unknown_placeholders_are_kept_and_unknown_values_ignored() {
        let template = PromptTemplate {
            key: "t".to_string(),
            name: "T".to_string(),
            text: "{a} and {b} and {a}".to_string(),
            parameters: vec![TemplateParameter::text("a", "A", "x", false)],
        };
        let rendered = template.render(&values(&[("zzz", "ignored")]));
        assert_eq!(rendered, "x and {b} and x");
    }

    #[test]
    fn select_validation_checks_choices() {
        let library = TemplateLibrary::builtin();
        let param = library
            .get("character")
            .and_then(|t| t.parameter("character_type"))
            .unwrap();
        assert!(param.validate("mage").is_ok());
        let err = param.validate("pirate").unwrap_err();
        assert!(matches!(
            &err,
            PromptError::InvalidChoice { name, value, choices }
                if name == "character_type" && value == "pirate" && choices.iter().any(|c| c == "mage")
        ));
        assert!(err.to_string().starts_with("'pirate' is not a valid choice for 'character_type'"));
    }

    #[test]
    fn integer_validation_checks_range() {
        let library = TemplateLibrary::builtin();
        let age = library
            .get("character")
            .and_then(|t| t.parameter("age"))
            .unwrap();
        assert!(age.validate("1000").is_ok());
        assert!(age.validate(" 7 ").is_ok());
        assert_eq!(
            age.validate("0"),
            Err(PromptError::OutOfRange {
                name: "age".to_string(),
                value: 0,
                min: 1,
                max: 1000,
            })
        );
        assert_eq!(
            age.validate("old"),
            Err(PromptError::NotAnInteger {
                name: "age".to_string(),
                value: "old".to_string(),
            })
        );
        assert_eq!(
            age.validate("1001").unwrap_err().to_string(),
            "'age' must be between 1 and 1000, got 1001"
        );
    }

    #[test]
    fn template_serializes_with_tagged_kinds() {
        let library = TemplateLibrary::builtin();
        let json = serde_json::to_value(library.get("character").unwrap()).unwrap();
        assert_eq!(json["parameters"][2]["kind"]["type"], "integer");
        assert_eq!(json["parameters"][2]["default"], 25);
        assert_eq!(json["parameters"][0]["kind"]["choices"][4], "bard");
    }
}
