// Crate-wide clippy allowances
#![allow(
    clippy::collapsible_if,
    clippy::needless_range_loop,
    clippy::len_without_is_empty,
    clippy::doc_lazy_continuation,
    clippy::too_many_arguments
)]

/// Use mimalloc as the global allocator for the library and the binary.
/// Term reading interns many short atom and string names.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod common;
pub mod heap;
pub mod lists;
pub mod sort;
