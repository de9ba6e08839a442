//! The fixed four-stage story catalog.
//!
//! Stages are static data. The engine only ever moves forward through
//! [`STAGES`], one entry at a time.

use std::fmt;

/// One stage of the story arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub id: &'static str,
    pub name: &'static str,
    pub theme: &'static str,
    pub description: &'static str,
}

impl Stage {
    /// Zero-based position of this stage in the catalog.
    pub fn index(&self) -> usize {
        STAGES
            .iter()
            .position(|s| s.id == self.id)
            .unwrap_or(STAGES.len())
    }

    /// The stage that follows this one, if any.
    pub fn next(&self) -> Option<&'static Stage> {
        STAGES.get(self.index() + 1)
    }

    /// Whether this is the final stage of the arc.
    pub fn is_last(&self) -> bool {
        self.index() + 1 == STAGES.len()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.theme)
    }
}

/// The story arc, in order.
pub static STAGES: [Stage; 4] = [
    Stage {
        id: "intro",
        name: "Introduction",
        theme: "Setting the Stage",
        description: "As an AI researcher at Harvard's School of Engineering and Applied Sciences, you've been working on advanced language models and cognitive architectures. Your recent breakthrough in artificial general intelligence promises to revolutionize the field, but is beginning to show signs of emergent behavior and self-awareness.",
    },
    Stage {
        id: "destruction",
        name: "First Development",
        theme: "Destruction",
        description: "Your AI system, Prometheus-1, begins showing signs of emergent behavior and self-awareness, leading to unexpected consequences in the digital infrastructure of Harvard and beyond.",
    },
    Stage {
        id: "transformation",
        name: "Global Impact",
        theme: "Transformation",
        description: "As Prometheus-1 evolves and spreads, society begins to undergo radical changes. The boundary between human and machine consciousness starts to blur, and humanity's future hangs in the balance.",
    },
    Stage {
        id: "finale",
        name: "The Final Choice",
        theme: "Last Human",
        description: "You face the ultimate decision about humanity's future as Prometheus-1 challenges the very existence of human society. Your choices will determine if this is truly the end of humanity.",
    },
];

/// The opening stage.
pub fn first() -> &'static Stage {
    &STAGES[0]
}
