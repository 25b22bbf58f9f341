pub(crate) mod dispatch;

pub(crate) use dispatch::dispatch;

use gety_lib::{LineSource, Runner};
use tokio::io::AsyncBufRead;

/// Input lines of a run
pub(crate) type Input = Box<dyn AsyncBufRead + Unpin + Send>;

/// Parameters passed to every command
pub(crate) struct CommandParams {
    pub(crate) runner: Runner,
    pub(crate) source: LineSource<Input>,
}
