// Operation requests: parsing from (name, arguments) and path templates

use crate::catalog::{App, AppDoc, CommonDoc, Operation, Skill};
use serde::Deserialize;
use std::path::PathBuf;

/// Errors raised while turning a name and argument mapping into a request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid arguments for {operation}: {reason}")]
    InvalidArguments { operation: Operation, reason: String },
}

/// A validated request for exactly one document
///
/// Every path segment comes from a closed enumeration, so a request can only
/// ever resolve to one of the three fixed templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocRequest {
    LoadSkill { skill: Skill },
    ReadCommon { file: CommonDoc },
    ReadAppDoc { app: App, file: AppDoc },
}

#[derive(Debug, Deserialize)]
struct LoadSkillArgs {
    skill: Skill,
}

#[derive(Debug, Deserialize)]
struct ReadCommonArgs {
    file: CommonDoc,
}

#[derive(Debug, Deserialize)]
struct ReadAppDocArgs {
    app: App,
    file: AppDoc,
}

impl DocRequest {
    /// Parse an operation name and its JSON argument mapping
    pub fn parse(name: &str, arguments: serde_json::Value) -> Result<Self, RequestError> {
        let operation = Operation::from_name(name)
            .ok_or_else(|| RequestError::UnknownOperation(name.to_string()))?;

        // A call without arguments reports the missing field, not a type error
        let arguments = if arguments.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            arguments
        };

        let invalid = |e: serde_json::Error| RequestError::InvalidArguments {
            operation,
            reason: e.to_string(),
        };

        let request = match operation {
            Operation::LoadSkill => {
                let args: LoadSkillArgs = serde_json::from_value(arguments).map_err(invalid)?;
                DocRequest::LoadSkill { skill: args.skill }
            }
            Operation::ReadCommon => {
                let args: ReadCommonArgs = serde_json::from_value(arguments).map_err(invalid)?;
                DocRequest::ReadCommon { file: args.file }
            }
            Operation::ReadAppDoc => {
                let args: ReadAppDocArgs = serde_json::from_value(arguments).map_err(invalid)?;
                DocRequest::ReadAppDoc {
                    app: args.app,
                    file: args.file,
                }
            }
        };

        Ok(request)
    }

    pub fn operation(&self) -> Operation {
        match self {
            DocRequest::LoadSkill { .. } => Operation::LoadSkill,
            DocRequest::ReadCommon { .. } => Operation::ReadCommon,
            DocRequest::ReadAppDoc { .. } => Operation::ReadAppDoc,
        }
    }

    /// Path of the document relative to the document root
    pub fn relative_path(&self) -> PathBuf {
        match self {
            DocRequest::LoadSkill { skill } => ["skills", skill.as_str(), "SKILL.md"].iter().collect(),
            DocRequest::ReadCommon { file } => {
                ["docs".to_string(), format!("{}.md", file.as_str())].iter().collect()
            }
            DocRequest::ReadAppDoc { app, file } => {
                [app.as_str().to_string(), format!("{}.md", file.as_str())].iter().collect()
            }
        }
    }

    /// Every request the catalog can express
    pub fn all() -> Vec<DocRequest> {
        let mut requests = Vec::new();
        for skill in Skill::ALL {
            requests.push(DocRequest::LoadSkill { skill });
        }
        for file in CommonDoc::ALL {
            requests.push(DocRequest::ReadCommon { file });
        }
        for app in App::ALL {
            for file in AppDoc::ALL {
                requests.push(DocRequest::ReadAppDoc { app, file });
            }
        }
        requests
    }
}

impl std::fmt::Display for DocRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocRequest::LoadSkill { skill } => write!(f, "load_skill(skill={})", skill),
            DocRequest::ReadCommon { file } => write!(f, "read_common(file={})", file),
            DocRequest::ReadAppDoc { app, file } => {
                write!(f, "read_app_doc(app={}, file={})", app, file)
            }
        }
    }
}
