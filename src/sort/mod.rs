pub mod compare;
pub mod core;
pub mod key;
pub mod list;
pub mod merge;


pub use self::compare::*;
pub use self::core::*;
pub use self::key::*;
pub use self::list::{HeapChain, HeapListBuilder, NodeBlock, NodeIx};
pub use self::merge::{MergeOutcome, SortChain, nat_sort};
