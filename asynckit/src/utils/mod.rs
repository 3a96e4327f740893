//! Sequence helpers: lazy combinators over iterators and streams, and an
//! abortable interval stream.

mod interval;
mod sequence;

pub use interval::{interval_loop, IntervalLoop};
pub use sequence::{enumerate, enumerate_async, map_async, map_lazy, reduce, reduce_async, Step};
