/// How much to request from a list's item source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DemandStrategy {
    /// Items requested as soon as a source is attached or assigned.
    /// Default is 10.
    pub initial_demand: usize,

    /// Items requested beyond the position of a just-visible item.
    /// Default is 5.
    pub lookahead: usize,
}

impl Default for DemandStrategy {
    fn default() -> Self {
        Self {
            initial_demand: 10,
            lookahead: 5,
        }
    }
}

impl DemandStrategy {
    pub fn new(initial_demand: usize, lookahead: usize) -> Self {
        Self {
            initial_demand,
            lookahead,
        }
    }

    pub fn with_initial_demand(mut self, initial_demand: usize) -> Self {
        self.initial_demand = initial_demand;
        self
    }

    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// Demand implied by `position` becoming visible.
    pub fn demand_for_position(&self, position: usize) -> usize {
        position.saturating_add(self.lookahead)
    }
}
