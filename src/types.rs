/// One pipeline element: a command with its argument vector and the optional
/// edge redirections. `argv` is never empty and `argv[0]` is the command name.
/// All byte slices borrow from the input line, so dropping the line releases
/// every stage on every path.
#[derive(Debug, PartialEq, Eq)]
pub struct Stage<'a> {
	pub argv: Vec<&'a [u8]>,
	pub input: Option<&'a [u8]>,
	pub output: Option<&'a [u8]>,
}

impl<'a> Stage<'a> {
	pub fn name(&self) -> &'a [u8] {
		self.argv[0]
	}
}

/// An ordered, non-empty sequence of stages. Interior stages carry no
/// redirections; they talk through pipes only. The parser enforces that
/// `input` appears on the first stage at most and `output` on the last.
#[derive(Debug, PartialEq, Eq)]
pub struct PipelineSpec<'a> {
	pub stages: Vec<Stage<'a>>,
}

impl<'a> PipelineSpec<'a> {
	pub fn len(&self) -> usize {
		self.stages.len()
	}

	pub fn first(&self) -> &Stage<'a> {
		&self.stages[0]
	}
}
