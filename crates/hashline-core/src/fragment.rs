//! Round fragments and the per-item set that orders them

/// Number of rounds computed for every item in the MultiHash stage.
pub const ROUNDS: usize = 6;

/// One indexed partial result from a MultiHash round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub round: usize,
    pub payload: String,
}

impl Fragment {
    pub fn new(round: usize, payload: impl Into<String>) -> Self {
        Self {
            round,
            payload: payload.into(),
        }
    }
}

/// Reason a [`FragmentSet`] refused to finalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentError {
    Incomplete { present: usize },
    DuplicateRound(usize),
    RoundOutOfRange(usize),
}

impl std::fmt::Display for FragmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incomplete { present } => {
                write!(f, "incomplete round group ({present}/{ROUNDS} fragments)")
            }
            Self::DuplicateRound(r) => write!(f, "round {r} reported twice"),
            Self::RoundOutOfRange(r) => write!(f, "round {r} outside 0..{ROUNDS}"),
        }
    }
}

impl std::error::Error for FragmentError {}

/// Unordered bag of fragments for one item's round group.
///
/// Fragments arrive in whatever order the round tasks finish. Order is
/// imposed only by [`finalize`](FragmentSet::finalize), which refuses to
/// produce output unless every round 0..6 is present exactly once.
#[derive(Debug, Default)]
pub struct FragmentSet {
    fragments: Vec<Fragment>,
}

impl FragmentSet {
    pub fn new() -> Self {
        Self {
            fragments: Vec::with_capacity(ROUNDS),
        }
    }

    pub fn add(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// True when exactly one fragment per round is present.
    pub fn is_complete(&self) -> bool {
        self.check().is_ok()
    }

    fn check(&self) -> Result<(), FragmentError> {
        let mut seen = [false; ROUNDS];
        for f in &self.fragments {
            let slot = seen
                .get_mut(f.round)
                .ok_or(FragmentError::RoundOutOfRange(f.round))?;
            if *slot {
                return Err(FragmentError::DuplicateRound(f.round));
            }
            *slot = true;
        }
        if self.fragments.len() < ROUNDS {
            return Err(FragmentError::Incomplete {
                present: self.fragments.len(),
            });
        }
        Ok(())
    }

    /// Sort by round and concatenate payloads with no separator.
    pub fn finalize(mut self) -> Result<String, FragmentError> {
        self.check()?;
        self.fragments.sort_unstable_by_key(|f| f.round);
        Ok(self.fragments.into_iter().map(|f| f.payload).collect())
    }
}
