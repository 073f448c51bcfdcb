use rand::Rng;

/// Stochastic in-place update of one or more named state attributes.
pub trait Mutator<S> {
    /// Attributes that [`mutate`](Mutator::mutate) may write.
    fn mutated_attributes(&self) -> Vec<&str>;

    /// Mutate `state` in place. Must only touch the declared attributes.
    fn mutate<R: Rng + ?Sized>(&self, state: &mut S, rng: &mut R);
}

impl<S, T: Mutator<S> + ?Sized> Mutator<S> for &T {
    fn mutated_attributes(&self) -> Vec<&str> {
        (**self).mutated_attributes()
    }

    fn mutate<R: Rng + ?Sized>(&self, state: &mut S, rng: &mut R) {
        (**self).mutate(state, rng);
    }
}
