//! Concrete games implementing `rules::Game`.

pub mod mnk;
