//! Arena window management.
//!
//! A queue is an append-only log split into fixed-size arenas, one file
//! each. Only a bounded window of arenas is mapped at once:
//!
//! ```text
//!   head                          tail
//!    |                              |
//! [ a0 ][ a1 ][ a2 ] ... [ a7 ][ a8 ]
//!  \______ window _____/       ^
//!                              always resident
//! ```
//!
//! The window holds `memory_size / arena_size - 1` arenas counted from the
//! head arena. The arena holding the tail is kept mapped even when it lies
//! outside the window so appends can always proceed.

mod manager;

pub use manager::ArenaManager;
