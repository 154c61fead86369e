/// Reference id handed to the client. `0` means "nothing to expand".
pub type ReferenceId = i64;

/// Monotonic id source shared by frames, scopes and expandable variables.
#[derive(Debug)]
pub struct ReferenceAllocator {
    initial: ReferenceId,
    next: ReferenceId,
}

impl ReferenceAllocator {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(initial: ReferenceId) -> Self {
        Self {
            initial,
            next: initial,
        }
    }

    pub fn allocate(&mut self) -> ReferenceId {
        self.next += 1;
        self.next
    }

    /// Only called at the start of a stack-trace cycle.
    pub fn reset(&mut self) {
        self.next = self.initial;
    }

    pub fn last(&self) -> ReferenceId {
        self.next
    }
}

impl Default for ReferenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}
