/// Defines a loop body function able to handle the equivalent of a foreach's body.
pub trait IBreakableForEach<T> {
    /// Executes one execution of the loop body.
    ///
    /// # Arguments
    ///
    /// * `i` - Visited element.
    ///
    /// # Returns
    ///
    /// True if the loop should continue, false otherwise.
    fn loop_body(&mut self, i: T) -> bool;
}

/// Collecting into a vector never breaks.
impl<T> IBreakableForEach<T> for Vec<T> {
    #[inline(always)]
    fn loop_body(&mut self, i: T) -> bool {
        self.push(i);
        true
    }
}

/// Adapts a closure into a breakable loop body.
pub struct BreakableClosure<F>(pub F);

impl<T, F: FnMut(T) -> bool> IBreakableForEach<T> for BreakableClosure<F> {
    #[inline(always)]
    fn loop_body(&mut self, i: T) -> bool {
        (self.0)(i)
    }
}
