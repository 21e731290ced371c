//! Job taxonomy — the static three-level category → subcategory → title tree,
//! and the `RoleSelection` value object that walks it.
//!
//! A selection can only move forward through validated transitions, so the
//! subcategory and title can never disagree with the chosen category.

use serde::Serialize;
use thiserror::Error;

/// Separator used in fully-qualified role strings.
pub const ROLE_SEPARATOR: &str = " > ";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Subcategory {
    pub name: &'static str,
    pub titles: &'static [&'static str],
}

/// How a category reaches its titles.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "kind", content = "entries", rename_all = "snake_case")]
pub enum Branches {
    /// Category → subcategory → title.
    Nested(&'static [Subcategory]),
    /// Category → title; the subcategory step is skipped.
    Direct(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Category {
    pub name: &'static str,
    pub branches: Branches,
}

impl Category {
    pub fn has_subcategories(&self) -> bool {
        matches!(self.branches, Branches::Nested(_))
    }

    pub fn subcategory(&self, name: &str) -> Option<&'static Subcategory> {
        match self.branches {
            Branches::Nested(subs) => subs.iter().find(|s| s.name == name),
            Branches::Direct(_) => None,
        }
    }

    fn direct_title(&self, title: &str) -> Option<&'static str> {
        match self.branches {
            Branches::Direct(titles) => titles.iter().copied().find(|t| *t == title),
            Branches::Nested(_) => None,
        }
    }
}

pub const JOB_CATEGORIES: &[Category] = &[
    Category {
        name: "Technical Roles",
        branches: Branches::Nested(&[
            Subcategory {
                name: "Web/ Software Dev",
                titles: &[
                    "Backend Engineer",
                    "Frontend Developer",
                    "Full-Stack Developer",
                    "Web Developer",
                ],
            },
            Subcategory {
                name: "Blockchain / Web3",
                titles: &["Smart Contract", "Protocol Engineer"],
            },
            Subcategory {
                name: "Data/ AI",
                titles: &["Machine Learning", "AI"],
            },
            Subcategory {
                name: "Security",
                titles: &["Security Engineer"],
            },
        ]),
    },
    Category {
        name: "Business Roles",
        branches: Branches::Nested(&[
            Subcategory {
                name: "Marketing",
                titles: &["Marketer", "Brand Strategist", "Content Creator"],
            },
            Subcategory {
                name: "Product/Strategy",
                titles: &["Product Manager", "Business Analyst"],
            },
            Subcategory {
                name: "Human Resources",
                titles: &["People Operations", "HR Manager", "Talent Acquisition"],
            },
            Subcategory {
                name: "Customer / Operations",
                titles: &[
                    "Customer Success Manager",
                    "Customer Support Specialist",
                    "Operations Manager",
                ],
            },
        ]),
    },
    Category {
        name: "Creative Roles",
        branches: Branches::Nested(&[
            Subcategory {
                name: "Design",
                titles: &[
                    "UI/UX Designer",
                    "Visual Designer",
                    "Illustrator",
                    "Video Editor",
                    "3D Artist",
                    "AI Artist",
                    "Copywriter",
                    "Sound Designer",
                    "VFX Artist",
                ],
            },
            Subcategory {
                name: "Contents",
                titles: &["Songwriter", "Photographer"],
            },
        ]),
    },
    Category {
        name: "Professional Services",
        branches: Branches::Direct(&[
            "Consultant",
            "Auditor",
            "Lawyer/ Legal Counsel",
            "Pharmacist",
            "Clinical Researcher",
            "Counselor",
        ]),
    },
];

pub fn find_category(name: &str) -> Option<&'static Category> {
    JOB_CATEGORIES.iter().find(|c| c.name == name)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Unknown job category '{0}'")]
    UnknownCategory(String),

    #[error("Select a job category first")]
    NoCategory,

    #[error("Category '{0}' has no subcategories")]
    NoSubcategories(&'static str),

    #[error("Unknown subcategory '{subcategory}' in '{category}'")]
    UnknownSubcategory {
        category: &'static str,
        subcategory: String,
    },

    #[error("Select a subcategory of '{0}' first")]
    NoSubcategory(&'static str),

    #[error("Unknown job title '{0}' for the current selection")]
    UnknownTitle(String),
}

/// A fully chosen job role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobRole {
    Nested {
        category: &'static str,
        subcategory: &'static str,
        title: &'static str,
    },
    Direct {
        category: &'static str,
        title: &'static str,
    },
}

impl JobRole {
    pub fn title(&self) -> &'static str {
        match self {
            JobRole::Nested { title, .. } | JobRole::Direct { title, .. } => *title,
        }
    }

    /// `category > subcategory > title`, or the bare title for categories
    /// without subcategories.
    pub fn qualified(&self) -> String {
        match self {
            JobRole::Nested {
                category,
                subcategory,
                title,
            } => [*category, *subcategory, *title].join(ROLE_SEPARATOR),
            JobRole::Direct { title, .. } => title.to_string(),
        }
    }
}

/// Which picker the UI should show next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Picker {
    Category,
    Subcategory,
    Title,
    Closed,
}

/// Progress through the taxonomy. Every state is internally consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RoleSelection {
    #[default]
    Empty,
    Category {
        category: &'static str,
    },
    Subcategory {
        category: &'static str,
        subcategory: &'static str,
    },
    Complete {
        role: JobRole,
    },
}

impl RoleSelection {
    pub fn category(&self) -> Option<&'static Category> {
        let name = match self {
            RoleSelection::Empty => return None,
            RoleSelection::Category { category }
            | RoleSelection::Subcategory { category, .. } => *category,
            RoleSelection::Complete { role } => match role {
                JobRole::Nested { category, .. } | JobRole::Direct { category, .. } => *category,
            },
        };
        find_category(name)
    }

    pub fn role(&self) -> Option<&JobRole> {
        match self {
            RoleSelection::Complete { role } => Some(role),
            _ => None,
        }
    }

    /// Choosing a category always resets subcategory and title.
    pub fn select_category(&self, name: &str) -> Result<RoleSelection, SelectionError> {
        let category =
            find_category(name).ok_or_else(|| SelectionError::UnknownCategory(name.to_string()))?;
        Ok(RoleSelection::Category {
            category: category.name,
        })
    }

    /// Choosing a subcategory always resets the title.
    pub fn select_subcategory(&self, name: &str) -> Result<RoleSelection, SelectionError> {
        let category = self.category().ok_or(SelectionError::NoCategory)?;
        if !category.has_subcategories() {
            return Err(SelectionError::NoSubcategories(category.name));
        }
        let sub = category
            .subcategory(name)
            .ok_or_else(|| SelectionError::UnknownSubcategory {
                category: category.name,
                subcategory: name.to_string(),
            })?;
        Ok(RoleSelection::Subcategory {
            category: category.name,
            subcategory: sub.name,
        })
    }

    pub fn select_title(&self, title: &str) -> Result<RoleSelection, SelectionError> {
        let category = self.category().ok_or(SelectionError::NoCategory)?;

        let role = if category.has_subcategories() {
            let sub_name = match self {
                RoleSelection::Subcategory { subcategory, .. } => *subcategory,
                RoleSelection::Complete {
                    role: JobRole::Nested { subcategory, .. },
                } => *subcategory,
                _ => return Err(SelectionError::NoSubcategory(category.name)),
            };
            let sub = category
                .subcategory(sub_name)
                .ok_or(SelectionError::NoSubcategory(category.name))?;
            let title = sub
                .titles
                .iter()
                .copied()
                .find(|t| *t == title)
                .ok_or_else(|| SelectionError::UnknownTitle(title.to_string()))?;
            JobRole::Nested {
                category: category.name,
                subcategory: sub.name,
                title,
            }
        } else {
            let title = category
                .direct_title(title)
                .ok_or_else(|| SelectionError::UnknownTitle(title.to_string()))?;
            JobRole::Direct {
                category: category.name,
                title,
            }
        };

        Ok(RoleSelection::Complete { role })
    }

    /// The picker that follows this selection: a category without
    /// subcategories opens the title picker straight away.
    pub fn next_picker(&self) -> Picker {
        match self {
            RoleSelection::Empty => Picker::Category,
            RoleSelection::Category { .. } => match self.category() {
                Some(c) if !c.has_subcategories() => Picker::Title,
                _ => Picker::Subcategory,
            },
            RoleSelection::Subcategory { .. } => Picker::Title,
            RoleSelection::Complete { .. } => Picker::Closed,
        }
    }

    /// Titles offered by the title picker, or nothing until they are reachable.
    pub fn title_options(&self) -> &'static [&'static str] {
        let Some(category) = self.category() else {
            return &[];
        };
        match (category.branches, self) {
            (Branches::Direct(titles), _) => titles,
            (Branches::Nested(_), RoleSelection::Subcategory { subcategory, .. })
            | (
                Branches::Nested(_),
                RoleSelection::Complete {
                    role: JobRole::Nested { subcategory, .. },
                },
            ) => category
                .subcategory(subcategory)
                .map(|s| s.titles)
                .unwrap_or(&[]),
            _ => &[],
        }
    }
}
