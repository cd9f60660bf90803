/// Pipeline stages of a crawl run
///
/// A run walks the stages strictly in order. An interrupted run is never
/// resumed mid-stage; it starts over at `Seeding` and relies on the durable
/// stores to skip completed work.
use std::fmt;

/// Represents the stage a run is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Resolving seed categories (sitemap fetch or configured list)
    Seeding,

    /// Expanding seeds into listing page URLs
    ListingDiscovery,

    /// Visiting listing pages not yet in the listing ledger
    ListingFetch,

    /// Computing the item URLs still missing from the accumulator
    ItemDiscovery,

    /// Visiting and extracting pending item pages
    ItemFetch,

    /// Writing the dataset from the accumulator
    Materialize,

    /// Run finished
    Done,
}

impl Stage {
    /// Returns the stage that follows this one, or None for `Done`
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Seeding => Some(Self::ListingDiscovery),
            Self::ListingDiscovery => Some(Self::ListingFetch),
            Self::ListingFetch => Some(Self::ItemDiscovery),
            Self::ItemDiscovery => Some(Self::ItemFetch),
            Self::ItemFetch => Some(Self::Materialize),
            Self::Materialize => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// Returns true if a run may move from this stage to `target`
    ///
    /// Only the immediate successor is allowed.
    pub fn can_transition_to(&self, target: Stage) -> bool {
        self.next() == Some(target)
    }

    /// Returns true if this is the final stage
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Stage name as used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seeding => "SEEDING",
            Self::ListingDiscovery => "LISTING_DISCOVERY",
            Self::ListingFetch => "LISTING_FETCH",
            Self::ItemDiscovery => "ITEM_DISCOVERY",
            Self::ItemFetch => "ITEM_FETCH",
            Self::Materialize => "MATERIALIZE",
            Self::Done => "DONE",
        }
    }

    /// Returns all stages in run order
    pub fn all_stages() -> Vec<Self> {
        vec![
            Self::Seeding,
            Self::ListingDiscovery,
            Self::ListingFetch,
            Self::ItemDiscovery,
            Self::ItemFetch,
            Self::Materialize,
            Self::Done,
        ]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
