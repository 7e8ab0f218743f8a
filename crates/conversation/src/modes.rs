use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One user-toggleable request modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeFlag {
    DeepThink,
    Analyze,
    Optimize,
}

impl ModeFlag {
    pub const ALL: [ModeFlag; 3] = [Self::DeepThink, Self::Analyze, Self::Optimize];

    /// Human-facing name, also used in the joint-mode directive.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::DeepThink => "Deep Think",
            Self::Analyze => "Analysis",
            Self::Optimize => "Optimization",
        }
    }

    /// Keyword accepted by [`FromStr`].
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::DeepThink => "deep",
            Self::Analyze => "analyze",
            Self::Optimize => "optimize",
        }
    }
}

impl fmt::Display for ModeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mode '{0}' (expected deep, analyze or optimize)")]
pub struct UnknownModeFlag(pub String);

impl FromStr for ModeFlag {
    type Err = UnknownModeFlag;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deep" | "deep-think" | "deepthink" => Ok(Self::DeepThink),
            "analyze" | "analysis" => Ok(Self::Analyze),
            "optimize" | "optimization" => Ok(Self::Optimize),
            _ => Err(UnknownModeFlag(value.trim().to_string())),
        }
    }
}

/// Independent boolean modifiers applied to the next dispatched request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModeSet {
    pub deep_think: bool,
    pub analyze: bool,
    pub optimize: bool,
}

impl ModeSet {
    #[must_use]
    pub fn is_active(self, flag: ModeFlag) -> bool {
        match flag {
            ModeFlag::DeepThink => self.deep_think,
            ModeFlag::Analyze => self.analyze,
            ModeFlag::Optimize => self.optimize,
        }
    }

    pub fn set(&mut self, flag: ModeFlag, enabled: bool) {
        match flag {
            ModeFlag::DeepThink => self.deep_think = enabled,
            ModeFlag::Analyze => self.analyze = enabled,
            ModeFlag::Optimize => self.optimize = enabled,
        }
    }

    /// Flips `flag` and returns its new state.
    pub fn toggle(&mut self, flag: ModeFlag) -> bool {
        let enabled = !self.is_active(flag);
        self.set(flag, enabled);
        enabled
    }

    #[must_use]
    pub fn with(mut self, flag: ModeFlag) -> Self {
        self.set(flag, true);
        self
    }

    /// Active flags in declaration order.
    pub fn active(self) -> impl Iterator<Item = ModeFlag> {
        ModeFlag::ALL
            .into_iter()
            .filter(move |flag| self.is_active(*flag))
    }
}
