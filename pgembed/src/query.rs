//! Statement API types.
use std::io::Write;

use crate::{
    Result,
    pipeline,
    value::{Compat, Variable},
};

/// How the command text of a statement is interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatementType {
    /// Plain command text.
    #[default]
    Normal,
    /// The command text is the name of a prepared statement.
    Execute,
    /// `EXECUTE IMMEDIATE` of a dynamic command.
    ExecImmediate,
    /// Plain command text, prepared and cached on first use.
    PrepNormal,
    /// `PREPARE name AS ...`, the first input is the statement name.
    Prepare,
    /// `EXECUTE name(expr, ...)`, inputs are inlined in the command text.
    ExecWithExprList,
}

/// Entrypoint of the statement API.
pub fn query<'v>(line: i32, command: impl Into<String>) -> Query<'v> {
    Query {
        line,
        command: command.into(),
        compat: Compat::Pgsql,
        force_indicator: true,
        questionmarks: false,
        kind: StatementType::Normal,
        connection: None,
        inputs: vec![],
        outputs: vec![],
        copy: None,
    }
}

/// The statement API.
#[must_use = "statements do nothing unless executed"]
pub struct Query<'v> {
    pub(crate) line: i32,
    pub(crate) command: String,
    pub(crate) compat: Compat,
    pub(crate) force_indicator: bool,
    pub(crate) questionmarks: bool,
    pub(crate) kind: StatementType,
    pub(crate) connection: Option<String>,
    pub(crate) inputs: Vec<Variable<'v>>,
    pub(crate) outputs: Vec<Variable<'v>>,
    pub(crate) copy: Option<&'v mut dyn Write>,
}

impl<'v> Query<'v> {
    pub fn compat(mut self, compat: Compat) -> Self {
        self.compat = compat;
        self
    }

    /// Raise instead of writing sentinel nulls when an output has no
    /// indicator. On by default.
    pub fn force_indicator(mut self, force: bool) -> Self {
        self.force_indicator = force;
        self
    }

    /// Recognize `?` placeholders.
    pub fn questionmarks(mut self, questionmarks: bool) -> Self {
        self.questionmarks = questionmarks;
        self
    }

    pub fn kind(mut self, kind: StatementType) -> Self {
        self.kind = kind;
        self
    }

    /// Run on the named connection instead of the current one.
    pub fn connection(mut self, name: &str) -> Self {
        self.connection = Some(name.to_owned());
        self
    }

    /// Bind the next input.
    pub fn input(mut self, var: impl Into<Variable<'v>>) -> Self {
        self.inputs.push(var.into());
        self
    }

    /// Bind the next output.
    pub fn output(mut self, var: impl Into<Variable<'v>>) -> Self {
        self.outputs.push(var.into());
        self
    }

    /// Receive `COPY ... TO STDOUT` data, standard output by default.
    pub fn copy_to(mut self, sink: &'v mut dyn Write) -> Self {
        self.copy = Some(sink);
        self
    }

    /// Run the statement.
    pub fn execute(self) -> Result<()> {
        pipeline::run(self)
    }
}

impl std::fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("line", &self.line)
            .field("command", &self.command)
            .field("kind", &self.kind)
            .field("connection", &self.connection)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .finish()
    }
}
