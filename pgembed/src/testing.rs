//! Scripted wire library used by the unit tests.
//!
//! A [`FakeWire`] answers commands from a list of rules, records every call
//! in a shared [`Log`], and tracks the transaction state the way a server
//! would. Connections are handed out by a process wide connector that pops
//! scripted wires from a queue local to the calling thread.
use bytes::Bytes;
use parking_lot::Mutex;
use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    sync::{Arc, Once},
};

use crate::{
    common::ByteStr,
    postgres::{Notify, PgResult, ResultStatus},
    transport::{self, ConnStatus, CopyData, Notice, NoticeReceiver, Param, PgWire, TransactionStatus},
};

struct Rule {
    needle: String,
    result: PgResult,
    once: bool,
    copy: Option<Vec<Bytes>>,
}

struct State {
    connect_params: Vec<(String, String)>,
    executed: Vec<String>,
    prepared: Vec<(String, String)>,
    statements: HashMap<String, String>,
    params: Vec<(String, Vec<Option<String>>)>,
    rules: Vec<Rule>,
    fail_prepare: Option<(String, String)>,
    describe: Option<PgResult>,
    lost: bool,
    tx: TransactionStatus,
    notices: Vec<Notice>,
    notifies: VecDeque<Notify>,
    copy: VecDeque<CopyData>,
    copy_tail: Option<PgResult>,
    copy_ended: Option<String>,
    finished: bool,
    std_strings: bool,
}

impl State {
    fn new() -> Self {
        Self {
            connect_params: vec![],
            executed: vec![],
            prepared: vec![],
            statements: HashMap::new(),
            params: vec![],
            rules: vec![],
            fail_prepare: None,
            describe: None,
            lost: false,
            tx: TransactionStatus::Idle,
            notices: vec![],
            notifies: VecDeque::new(),
            copy: VecDeque::new(),
            copy_tail: None,
            copy_ended: None,
            finished: false,
            std_strings: true,
        }
    }

    fn lost_result() -> PgResult {
        PgResult::builder(ResultStatus::FatalError).build()
    }

    /// Answer `sql` from the rules, falling back to a command tag named
    /// after the first word.
    fn answer(&mut self, sql: &str) -> PgResult {
        let lower = sql.to_ascii_lowercase();

        if let Some(i) = self.rules.iter().position(|r| lower.contains(&r.needle)) {
            let rule = &self.rules[i];
            let result = rule.result.clone();
            if let Some(rows) = &rule.copy {
                self.copy = rows.iter().cloned().map(CopyData::Row).collect();
                self.copy.push_back(CopyData::Done);
                self.copy_tail = Some(PgResult::builder(ResultStatus::CommandOk).command(&format!("COPY {}", rows.len())).build());
            }
            if rule.once {
                self.rules.remove(i);
            }
            return result;
        }

        if lower.starts_with("deallocate ") {
            let name = sql["deallocate ".len()..].trim_matches('"');
            if self.statements.remove(name).is_none() {
                return PgResult::builder(ResultStatus::FatalError)
                    .error("26000", &format!("prepared statement \"{name}\" does not exist"))
                    .build();
            }
            return PgResult::builder(ResultStatus::CommandOk).command("DEALLOCATE").build();
        }

        let tag = lower.split_whitespace().next().unwrap_or_default().to_ascii_uppercase();
        PgResult::builder(ResultStatus::CommandOk).command(&tag).build()
    }

    fn track(&mut self, sql: &str, result: &PgResult) {
        let lower = sql.trim_start().to_ascii_lowercase();
        let failed = !matches!(result.status(), ResultStatus::CommandOk | ResultStatus::TuplesOk | ResultStatus::CopyOut);

        if failed {
            if self.tx == TransactionStatus::InTrans {
                self.tx = TransactionStatus::InError;
            }
        } else if lower.starts_with("begin") || lower.starts_with("start") {
            self.tx = TransactionStatus::InTrans;
        } else if ["commit", "rollback", "end", "abort"].iter().any(|p| lower.starts_with(p)) {
            self.tx = TransactionStatus::Idle;
        }
    }
}

/// Shared view of the calls made on a [`FakeWire`], also used to script it
/// after it has been handed to a connection.
#[derive(Clone)]
pub(crate) struct Log(Arc<Mutex<State>>);

impl Log {
    pub(crate) fn connect_params(&self) -> Vec<(String, String)> {
        self.0.lock().connect_params.clone()
    }

    /// Commands sent without parameters.
    pub(crate) fn executed(&self) -> Vec<String> {
        self.0.lock().executed.clone()
    }

    /// Statements prepared on the server, name and text.
    pub(crate) fn prepared(&self) -> Vec<(String, String)> {
        self.0.lock().prepared.clone()
    }

    /// Parameterized commands and prepared executions, with their values.
    pub(crate) fn params(&self) -> Vec<(String, Vec<Option<String>>)> {
        self.0.lock().params.clone()
    }

    /// Answer every command containing `needle` with `result`.
    pub(crate) fn on(&self, needle: &str, result: PgResult) {
        self.push_rule(needle, result, false, None);
    }

    /// Answer the next command containing `needle` with `result`.
    pub(crate) fn once(&self, needle: &str, result: PgResult) {
        self.push_rule(needle, result, true, None);
    }

    /// Answer a command containing `needle` with a `COPY OUT` of `rows`.
    pub(crate) fn copy_out(&self, needle: &str, rows: &[&str]) {
        let rows = rows.iter().map(|r| Bytes::copy_from_slice(r.as_bytes())).collect();
        self.push_rule(needle, PgResult::empty(ResultStatus::CopyOut), false, Some(rows));
    }

    fn push_rule(&self, needle: &str, result: PgResult, once: bool, copy: Option<Vec<Bytes>>) {
        let needle = needle.to_ascii_lowercase();
        self.0.lock().rules.push(Rule { needle, result, once, copy });
    }

    /// Fail the next prepare with the given error.
    pub(crate) fn fail_prepare(&self, sqlstate: &str, message: &str) {
        self.0.lock().fail_prepare = Some((sqlstate.to_owned(), message.to_owned()));
    }

    /// Result returned when describing a prepared statement.
    pub(crate) fn on_describe(&self, result: PgResult) {
        self.0.lock().describe = Some(result);
    }

    /// Behave as if the server went away.
    pub(crate) fn lose_connection(&self) {
        self.0.lock().lost = true;
    }

    /// Deliver a notice during the next command.
    pub(crate) fn notice(&self, sqlstate: &'static str, message: &'static str) {
        self.0.lock().notices.push(Notice {
            severity: ByteStr::from_static("WARNING"),
            sqlstate: Some(ByteStr::from_static(sqlstate)),
            message: ByteStr::from_static(message),
        });
    }

    /// Queue an asynchronous notification.
    pub(crate) fn notify(&self, channel: &'static str, payload: &'static str) {
        self.0.lock().notifies.push_back(Notify {
            channel: ByteStr::from_static(channel),
            pid: 42,
            payload: ByteStr::from_static(payload),
        });
    }

    pub(crate) fn pending_notifies(&self) -> usize {
        self.0.lock().notifies.len()
    }

    pub(crate) fn copy_ended(&self) -> Option<String> {
        self.0.lock().copy_ended.clone()
    }

    pub(crate) fn standard_conforming_strings(&self, on: bool) {
        self.0.lock().std_strings = on;
    }

    pub(crate) fn finished(&self) -> bool {
        self.0.lock().finished
    }
}

/// A scripted wire library connection.
pub(crate) struct FakeWire {
    state: Arc<Mutex<State>>,
    receiver: Option<NoticeReceiver>,
    broken: Option<String>,
}

impl FakeWire {
    pub(crate) fn new() -> Self {
        Self { state: Arc::new(Mutex::new(State::new())), receiver: None, broken: None }
    }

    /// Report a bad status right after connecting.
    pub(crate) fn broken(mut self, message: &str) -> Self {
        self.broken = Some(message.to_owned());
        self
    }

    pub(crate) fn log(&self) -> Log {
        Log(self.state.clone())
    }

    fn deliver_notices(&mut self) {
        let notices = std::mem::take(&mut self.state.lock().notices);
        if let Some(receiver) = &mut self.receiver {
            for notice in &notices {
                receiver(notice);
            }
        }
    }

    fn run(&mut self, sql: &str) -> Option<PgResult> {
        let result = {
            let mut state = self.state.lock();
            if state.lost {
                return Some(State::lost_result());
            }
            let result = state.answer(sql);
            state.track(sql, &result);
            result
        };
        self.deliver_notices();
        Some(result)
    }
}

fn texts(params: &[Param]) -> Vec<Option<String>> {
    params
        .iter()
        .map(|p| p.value.as_ref().map(|v| String::from_utf8_lossy(v).into_owned()))
        .collect()
}

impl PgWire for FakeWire {
    fn exec(&mut self, sql: &str) -> Option<PgResult> {
        self.state.lock().executed.push(sql.to_owned());
        self.run(sql)
    }

    fn exec_params(&mut self, sql: &str, params: &[Param]) -> Option<PgResult> {
        self.state.lock().params.push((sql.to_owned(), texts(params)));
        self.run(sql)
    }

    fn exec_prepared(&mut self, name: &str, params: &[Param]) -> Option<PgResult> {
        let sql = {
            let mut state = self.state.lock();
            state.params.push((name.to_owned(), texts(params)));
            match state.statements.get(name) {
                Some(sql) => sql.clone(),
                None => {
                    return Some(
                        PgResult::builder(ResultStatus::FatalError)
                            .error("26000", &format!("prepared statement \"{name}\" does not exist"))
                            .build(),
                    );
                }
            }
        };
        self.run(&sql)
    }

    fn prepare(&mut self, name: &str, sql: &str) -> Option<PgResult> {
        let mut state = self.state.lock();
        if state.lost {
            return Some(State::lost_result());
        }
        if let Some((sqlstate, message)) = state.fail_prepare.take() {
            return Some(PgResult::builder(ResultStatus::FatalError).error(&sqlstate, &message).build());
        }
        state.prepared.push((name.to_owned(), sql.to_owned()));
        state.statements.insert(name.to_owned(), sql.to_owned());
        Some(PgResult::empty(ResultStatus::CommandOk))
    }

    fn describe_prepared(&mut self, name: &str) -> Option<PgResult> {
        let state = self.state.lock();
        if state.lost {
            return Some(State::lost_result());
        }
        if !state.statements.contains_key(name) {
            return Some(
                PgResult::builder(ResultStatus::FatalError)
                    .error("26000", &format!("prepared statement \"{name}\" does not exist"))
                    .build(),
            );
        }
        Some(state.describe.clone().unwrap_or_else(|| PgResult::empty(ResultStatus::CommandOk)))
    }

    fn get_result(&mut self) -> Option<PgResult> {
        self.state.lock().copy_tail.take()
    }

    fn status(&self) -> ConnStatus {
        match self.broken.is_some() || self.state.lock().lost {
            true => ConnStatus::Bad,
            false => ConnStatus::Ok,
        }
    }

    fn transaction_status(&self) -> TransactionStatus {
        let state = self.state.lock();
        match state.lost {
            true => TransactionStatus::Unknown,
            false => state.tx,
        }
    }

    fn error_message(&self) -> String {
        match &self.broken {
            Some(message) => format!("{message}\n"),
            None => String::new(),
        }
    }

    fn parameter_status(&self, name: &str) -> Option<String> {
        match name {
            "standard_conforming_strings" => {
                Some(if self.state.lock().std_strings { "on" } else { "off" }.to_owned())
            }
            _ => None,
        }
    }

    fn set_notice_receiver(&mut self, receiver: NoticeReceiver) {
        self.receiver = Some(receiver);
    }

    fn notifies(&mut self) -> Option<Notify> {
        self.state.lock().notifies.pop_front()
    }

    fn get_copy_data(&mut self) -> CopyData {
        self.state.lock().copy.pop_front().unwrap_or(CopyData::Done)
    }

    fn end_copy(&mut self, error: Option<&str>) {
        self.state.lock().copy_ended = Some(error.unwrap_or_default().to_owned());
    }

    fn finish(&mut self) {
        self.state.lock().finished = true;
    }
}

thread_local! {
    static QUEUE: RefCell<VecDeque<FakeWire>> = const { RefCell::new(VecDeque::new()) };
}

/// Install the scripted connector, once per process.
pub(crate) fn install() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        transport::set_connector(|params: &[(&str, &str)]| -> Result<Box<dyn PgWire>, String> {
            let Some(wire) = QUEUE.with_borrow_mut(VecDeque::pop_front) else {
                return Err("no scripted connection".to_owned());
            };
            wire.state.lock().connect_params =
                params.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
            Ok(Box::new(wire))
        });
    });
}

/// Queue `wire` for the next connect on this thread.
pub(crate) fn push(wire: FakeWire) {
    QUEUE.with_borrow_mut(|q| q.push_back(wire));
}

/// Drop every queued wire of this thread.
pub(crate) fn clear() {
    QUEUE.with_borrow_mut(VecDeque::clear);
}

/// Connect a fresh scripted wire under `name` and return its log.
pub(crate) fn open(name: &str, compat: crate::value::Compat, autocommit: bool) -> Log {
    install();
    let wire = FakeWire::new();
    let log = wire.log();
    push(wire);
    if let Err(err) = crate::connection::connect(1, compat, Some("db"), None, None, Some(name), autocommit) {
        panic!("scripted connect failed: {err}");
    }
    log
}
