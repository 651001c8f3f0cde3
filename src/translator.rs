//! Collaborator interfaces for filling a claimed slot.
//!
//! Arity is specialized (0/1/2/3 user arguments, plus a slice-based vararg
//! form) so a caller never has to pack arguments into a heap-allocated
//! tuple just to hand them to the ring buffer. Each variant is a distinct
//! trait rather than one boxed closure, and Rust's monomorphization makes
//! the specialized forms zero-cost, matching the allowance in the
//! variadic-vs-arity-specialized design note.

/// Zero-argument slot constructor, called `size` times at startup to
/// pre-allocate the ring buffer's backing storage.
pub trait EventFactory<E> {
    /// Construct one fresh event instance.
    fn new_instance(&self) -> E;
}

impl<E, F> EventFactory<E> for F
where
    F: Fn() -> E,
{
    fn new_instance(&self) -> E {
        self()
    }
}

/// Mutates a claimed slot in place, given no user-supplied arguments beyond
/// the slot itself and its assigned sequence.
pub trait EventTranslator<E> {
    /// Fill `event`, claimed at `sequence`.
    fn translate_to(&self, event: &mut E, sequence: i64);
}

impl<E, F> EventTranslator<E> for F
where
    F: Fn(&mut E, i64),
{
    fn translate_to(&self, event: &mut E, sequence: i64) {
        self(event, sequence)
    }
}

/// Mutates a claimed slot given one user-supplied argument.
pub trait EventTranslatorOneArg<E, A> {
    /// Fill `event`, claimed at `sequence`, using `arg`.
    fn translate_to(&self, event: &mut E, sequence: i64, arg: A);
}

impl<E, A, F> EventTranslatorOneArg<E, A> for F
where
    F: Fn(&mut E, i64, A),
{
    fn translate_to(&self, event: &mut E, sequence: i64, arg: A) {
        self(event, sequence, arg)
    }
}

/// Mutates a claimed slot given two user-supplied arguments.
pub trait EventTranslatorTwoArg<E, A, B> {
    /// Fill `event`, claimed at `sequence`, using `arg0` and `arg1`.
    fn translate_to(&self, event: &mut E, sequence: i64, arg0: A, arg1: B);
}

impl<E, A, B, F> EventTranslatorTwoArg<E, A, B> for F
where
    F: Fn(&mut E, i64, A, B),
{
    fn translate_to(&self, event: &mut E, sequence: i64, arg0: A, arg1: B) {
        self(event, sequence, arg0, arg1)
    }
}

/// Mutates a claimed slot given three user-supplied arguments.
pub trait EventTranslatorThreeArg<E, A, B, C> {
    /// Fill `event`, claimed at `sequence`, using `arg0`, `arg1`, and `arg2`.
    fn translate_to(&self, event: &mut E, sequence: i64, arg0: A, arg1: B, arg2: C);
}

impl<E, A, B, C, F> EventTranslatorThreeArg<E, A, B, C> for F
where
    F: Fn(&mut E, i64, A, B, C),
{
    fn translate_to(&self, event: &mut E, sequence: i64, arg0: A, arg1: B, arg2: C) {
        self(event, sequence, arg0, arg1, arg2)
    }
}

/// Mutates a batch of claimed slots given a caller-owned argument slice, one
/// element per slot. Used by batched publish so the argument count doesn't
/// need a fixed arity.
pub trait EventTranslatorVararg<E, A> {
    /// Fill `event`, claimed at `sequence`, using the arguments for this
    /// slot's position in the batch.
    fn translate_to(&self, event: &mut E, sequence: i64, args: &[A], index: usize);
}

impl<E, A, F> EventTranslatorVararg<E, A> for F
where
    F: Fn(&mut E, i64, &[A], usize),
{
    fn translate_to(&self, event: &mut E, sequence: i64, args: &[A], index: usize) {
        self(event, sequence, args, index)
    }
}
