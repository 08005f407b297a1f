// Static operation catalog and the closed argument enumerations

use serde::{Deserialize, Serialize};

/// Skill documents under `skills/<skill>/SKILL.md`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    #[serde(rename = "project-orchestrator-doc")]
    ProjectOrchestratorDoc,
    #[serde(rename = "fit-api")]
    FitApi,
    #[serde(rename = "fit-mobile")]
    FitMobile,
}

impl Skill {
    pub const ALL: [Skill; 3] = [Skill::ProjectOrchestratorDoc, Skill::FitApi, Skill::FitMobile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Skill::ProjectOrchestratorDoc => "project-orchestrator-doc",
            Skill::FitApi => "fit-api",
            Skill::FitMobile => "fit-mobile",
        }
    }
}

/// Shared documents under `docs/<FILE>.md`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommonDoc {
    DomainSpec,
    ApiRegistry,
    Prd,
    SprintPlan,
}

impl CommonDoc {
    pub const ALL: [CommonDoc; 4] = [
        CommonDoc::DomainSpec,
        CommonDoc::ApiRegistry,
        CommonDoc::Prd,
        CommonDoc::SprintPlan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommonDoc::DomainSpec => "DOMAIN_SPEC",
            CommonDoc::ApiRegistry => "API_REGISTRY",
            CommonDoc::Prd => "PRD",
            CommonDoc::SprintPlan => "SPRINT_PLAN",
        }
    }
}

/// Applications with their own doc directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum App {
    #[serde(rename = "fit-api")]
    FitApi,
    #[serde(rename = "fit-mobile")]
    FitMobile,
}

impl App {
    pub const ALL: [App; 2] = [App::FitApi, App::FitMobile];

    pub fn as_str(&self) -> &'static str {
        match self {
            App::FitApi => "fit-api",
            App::FitMobile => "fit-mobile",
        }
    }
}

/// App-specific documents under `<app>/<FILE>.md`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppDoc {
    Architecture,
    Database,
    Screens,
}

impl AppDoc {
    pub const ALL: [AppDoc; 3] = [AppDoc::Architecture, AppDoc::Database, AppDoc::Screens];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppDoc::Architecture => "ARCHITECTURE",
            AppDoc::Database => "DATABASE",
            AppDoc::Screens => "SCREENS",
        }
    }
}

macro_rules! impl_display {
    ($($ty:ty),*) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

impl_display!(Skill, CommonDoc, App, AppDoc);

const SKILL_VALUES: &[&str] = &["project-orchestrator-doc", "fit-api", "fit-mobile"];
const COMMON_DOC_VALUES: &[&str] = &["DOMAIN_SPEC", "API_REGISTRY", "PRD", "SPRINT_PLAN"];
const APP_VALUES: &[&str] = &["fit-api", "fit-mobile"];
const APP_DOC_VALUES: &[&str] = &["ARCHITECTURE", "DATABASE", "SCREENS"];

/// A required argument and its closed set of legal values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub name: &'static str,
    pub allowed: &'static [&'static str],
}

/// The three document operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadSkill,
    ReadCommon,
    ReadAppDoc,
}

impl Operation {
    /// Catalog order, which is also the listing order
    pub const ALL: [Operation; 3] = [Operation::LoadSkill, Operation::ReadCommon, Operation::ReadAppDoc];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::LoadSkill => "load_skill",
            Operation::ReadCommon => "read_common",
            Operation::ReadAppDoc => "read_app_doc",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Operation::LoadSkill => "Load a skill. Start with 'project-orchestrator-doc' to route.",
            Operation::ReadCommon => "Read shared docs (DOMAIN_SPEC, API_REGISTRY, PRD, SPRINT_PLAN)",
            Operation::ReadAppDoc => "Read app-specific doc",
        }
    }

    /// Required arguments, all enumerated
    pub fn arguments(&self) -> &'static [ArgumentSpec] {
        match self {
            Operation::LoadSkill => &[ArgumentSpec {
                name: "skill",
                allowed: SKILL_VALUES,
            }],
            Operation::ReadCommon => &[ArgumentSpec {
                name: "file",
                allowed: COMMON_DOC_VALUES,
            }],
            Operation::ReadAppDoc => &[
                ArgumentSpec {
                    name: "app",
                    allowed: APP_VALUES,
                },
                ArgumentSpec {
                    name: "file",
                    allowed: APP_DOC_VALUES,
                },
            ],
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
