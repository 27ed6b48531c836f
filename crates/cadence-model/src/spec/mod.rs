mod poll;
pub use poll::PollSpec;
