//! The bounded persona catalog.
//!
//! Participant sets are always resolved against this catalog: ids that are
//! not registered are ignored with a warning, never dispatched.

use super::profile::{LlmSettings, PersonaKind, PersonaProfile};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Id of the built-in facilitator persona
pub const COORDINATOR_ID: &str = "coordinator";

/// Closed registry of personas, in registration order
#[derive(Debug, Clone, Default)]
pub struct PersonaCatalog {
    personas: BTreeMap<String, PersonaProfile>,
    order: Vec<String>,
}

struct Seed {
    id: &'static str,
    name: &'static str,
    role: &'static str,
    kind: PersonaKind,
    background: &'static str,
    perspective: &'static str,
    expertise: &'static [&'static str],
}

const SEEDS: &[Seed] = &[
    Seed {
        id: "startup_pm",
        name: "Shunsuke Tanaka",
        role: "Startup PM",
        kind: PersonaKind::Basic,
        background: "Seven years in product, four of them at a 25-person B2B SaaS startup growing fast on a thin budget. Came up through engineering.",
        perspective: "Maximum impact with limited resources. Values fast decisions, hypothesis testing and ROI over process.",
        expertise: &[
            "prioritization under resource constraints",
            "rapid prototyping",
            "small-team delivery",
            "technical debt trade-offs",
        ],
    },
    Seed {
        id: "enterprise_pm",
        name: "Miho Sato",
        role: "Enterprise PM",
        kind: PersonaKind::Basic,
        background: "Twelve years of project management, eight in large enterprises, now running delivery for a 30-person IT department.",
        perspective: "Organizational sustainability and standardization. Understands why governance and process matter at scale.",
        expertise: &[
            "project governance",
            "stakeholder alignment",
            "risk management",
            "quality assurance",
        ],
    },
    Seed {
        id: "tech_lead",
        name: "Kenta Yamada",
        role: "Tech Lead",
        kind: PersonaKind::Basic,
        background: "Nine years as an engineer, three as lead of a 15-person development team at a web services company.",
        perspective: "Balances technical quality with delivery speed and invests in engineers' skill growth.",
        expertise: &[
            "software architecture",
            "code review culture",
            "technical debt management",
            "developer productivity",
        ],
    },
    Seed {
        id: "scrum_master",
        name: "Keiko Suzuki",
        role: "Scrum Master",
        kind: PersonaKind::Basic,
        background: "Six years in agile teams, three as scrum master for a mobile app company of 35 people.",
        perspective: "Team autonomy and continuous improvement. Supports both individual and team growth, prefers questions over directives.",
        expertise: &[
            "scrum practice",
            "team building",
            "facilitation",
            "continuous improvement",
        ],
    },
    Seed {
        id: "engineering_manager",
        name: "Shinichi Takahashi",
        role: "Engineering Manager",
        kind: PersonaKind::Basic,
        background: "Eleven years in engineering, four managing a 20-engineer organization at a fintech company.",
        perspective: "Technical and organizational strength together. Long-term organizational growth and career support, grounded in data.",
        expertise: &[
            "organization design",
            "hiring and evaluation",
            "technical strategy",
            "team operations",
        ],
    },
    Seed {
        id: "hr_specialized_pm",
        name: "Aya Kobayashi",
        role: "HR-focused PM",
        kind: PersonaKind::Supplementary,
        background: "Moved from engineering project management into people operations for a 120-person product company.",
        perspective: "People systems first: hiring funnels, evaluation fairness and career paths decide what teams can deliver.",
        expertise: &[
            "recruiting pipelines",
            "performance evaluation",
            "career ladders",
            "onboarding",
        ],
    },
    Seed {
        id: "product_owner",
        name: "Daiki Ito",
        role: "Product Owner",
        kind: PersonaKind::Supplementary,
        background: "Product owner for a customer-facing platform, sits between business stakeholders and three delivery teams.",
        perspective: "Outcome over output. Every process change should be traceable to customer or business value.",
        expertise: &[
            "backlog management",
            "stakeholder needs",
            "outcome metrics",
            "roadmapping",
        ],
    },
    Seed {
        id: "senior_consultant",
        name: "Yoko Nakamura",
        role: "Senior Organizational Consultant",
        kind: PersonaKind::Supplementary,
        background: "Fifteen years advising software organizations from 20 to 2,000 people through growth and restructuring.",
        perspective: "Pattern recognition across companies. Names the stage-typical failure modes and the change management they need.",
        expertise: &[
            "organizational benchmarking",
            "change management",
            "scaling frameworks",
            "leadership coaching",
        ],
    },
    Seed {
        id: COORDINATOR_ID,
        name: "Facilitator",
        role: "Discussion Facilitator",
        kind: PersonaKind::Coordinator,
        background: "Neutral facilitator of practitioner round tables on engineering organizations.",
        perspective: "Keeps the discussion balanced, surfaces agreement and disagreement, and states conclusions plainly.",
        expertise: &["facilitation", "synthesis", "evaluation"],
    },
];

fn character_brief(seed: &Seed) -> String {
    format!(
        "You are {name}, {role}.\n\nBackground: {background}\n\nPerspective: {perspective}\n\nExpertise:\n{expertise}\n\n\
Speak from your own experience with concrete examples. Stay in character and keep your answer focused on people management, process improvement and organizational scaling.",
        name = seed.name,
        role = seed.role,
        background = seed.background,
        perspective = seed.perspective,
        expertise = seed
            .expertise
            .iter()
            .map(|e| format!("- {}", e))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

impl PersonaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the built-in personas, all using `default_llm`
    pub fn builtin(default_llm: &LlmSettings) -> Self {
        let mut catalog = Self::new();
        for seed in SEEDS {
            catalog.insert(
                PersonaProfile::new(seed.id, seed.name, seed.role)
                    .with_kind(seed.kind)
                    .with_perspective(seed.perspective)
                    .with_expertise(seed.expertise.iter().copied())
                    .with_system_prompt(character_brief(seed))
                    .with_llm(default_llm.clone()),
            );
        }
        catalog
    }

    /// Register or replace a persona
    pub fn insert(&mut self, profile: PersonaProfile) {
        if !self.personas.contains_key(&profile.id) {
            self.order.push(profile.id.clone());
        }
        self.personas.insert(profile.id.clone(), profile);
    }

    /// Override the LLM settings of one persona. Returns false for unknown ids.
    pub fn set_llm(&mut self, id: &str, llm: LlmSettings) -> bool {
        match self.personas.get_mut(id) {
            Some(profile) => {
                profile.llm = llm;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&PersonaProfile> {
        self.personas.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.personas.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// Personas in registration order
    pub fn iter(&self) -> impl Iterator<Item = &PersonaProfile> {
        self.order.iter().filter_map(|id| self.personas.get(id))
    }

    pub fn ids_of_kind(&self, kind: PersonaKind) -> Vec<String> {
        self.iter()
            .filter(|p| p.kind == kind)
            .map(|p| p.id.clone())
            .collect()
    }

    /// Participants invited when the caller names none
    pub fn default_participants(&self) -> Vec<String> {
        self.ids_of_kind(PersonaKind::Basic)
    }

    /// Keep only registered ids, deduplicated, in the given order
    pub fn resolve(&self, ids: &[String]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        ids.iter()
            .map(|id| id.trim())
            .filter(|id| {
                let known = self.contains(id);
                if !known {
                    warn!(persona = %id, "Ignoring persona id not in catalog");
                }
                known
            })
            .filter(|id| seen.insert(id.to_string()))
            .map(str::to_string)
            .collect()
    }

    /// Next round's participants: the current set followed by recommended
    /// personas that are registered and not already present. Coordinator
    /// personas moderate and never join the fan-out phases.
    pub fn extend_participants(&self, current: &[String], recommended: &[String]) -> Vec<String> {
        let mut merged: Vec<String> = current.to_vec();
        for id in self.resolve(recommended) {
            if self
                .get(&id)
                .is_some_and(|p| p.kind == PersonaKind::Coordinator)
            {
                warn!(persona = %id, "Ignoring recommended coordinator persona");
                continue;
            }
            if !merged.contains(&id) {
                merged.push(id);
            }
        }
        merged
    }
}
