//! Statement execution.
//!
//! A statement runs in phases, each of which may end the run early:
//!
//! 1. prologue, resolve the connection and the command text
//! 2. parameters, place every input at its placeholder
//! 3. transaction autostart when autocommit is off
//! 4. execution
//! 5. output processing, scatter the result into the outputs
use std::io::{self, Write};

use crate::{
    Result, cache,
    common::{debug_log, span, verbose},
    connection::{self, Inner},
    descriptor::{self, DescriptorItem},
    encode, memory,
    postgres::{ArrayKind, Oid, PgResult, ResultStatus, pg_type},
    query::{Query, StatementType},
    row::{self, Context},
    sql::{self, PlaceholderKind},
    sqlca::{self, code, raise, state},
    sqlda::Sqlda,
    statement,
    transport::{CopyData, Param, TransactionStatus},
    value::{Chars, Compat, HostValue, Indicator, Slot, SqldaSlot, Type, Variable},
};

pub(crate) fn run(mut q: Query) -> Result<()> {
    span!("ecpg_do", line = q.line);

    execute(&mut q)
}

fn execute(q: &mut Query) -> Result<()> {
    let line = q.line;
    let conn = connection::resolve(line, q.connection.as_deref())?;

    let mut kind = q.kind;
    let mut command = std::mem::take(&mut q.command);
    let mut name = None;

    if kind == StatementType::PrepNormal {
        command = cache::auto_prepare(line, q.connection.as_deref(), q.compat, &command)?;
        kind = StatementType::Execute;
    }

    let mut inner = conn.lock();

    if kind == StatementType::Execute {
        let Some(text) = inner.prepared_command(&command).map(str::to_owned) else {
            return Err(raise(line, code::INVALID_STMT, state::INVALID_SQL_STATEMENT_NAME, Some(&command)));
        };
        name = Some(std::mem::replace(&mut command, text));
    }

    let prepare_name = match kind {
        StatementType::Prepare => match q.inputs.first().and_then(input_text) {
            Some(name) => Some(name),
            None => return Err(raise(line, code::TOO_FEW_ARGUMENTS, state::INTERNAL_ERROR, None)),
        },
        _ => None,
    };

    let std_strings = inner.wire(line)?.parameter_status("standard_conforming_strings").as_deref() == Some("on");

    memory::clear_auto_mem();

    let (command, params) = {
        span!("build_params");
        build_params(q, kind, command, std_strings)?
    };

    if !inner.autocommit && inner.transaction_status() == TransactionStatus::Idle {
        inner.exec(line, q.compat, "begin transaction")?;
    }

    let conn_name = inner.name.clone();
    let wire = inner.wire(line)?;

    debug_log!(
        "ecpg_execute on line {line}: query: {command}; with {} parameter(s) on connection {conn_name}",
        params.len(),
    );

    let result = match &name {
        Some(name) => {
            debug_log!("ecpg_execute on line {line}: using PQexecPrepared for \"{name}\"");
            wire.exec_prepared(name, &params)
        }
        None if params.is_empty() => {
            debug_log!("ecpg_execute on line {line}: using PQexec");
            wire.exec(&command)
        }
        None => {
            debug_log!("ecpg_execute on line {line}: using PQexecParams");
            wire.exec_params(&command, &params)
        }
    };

    for (i, param) in params.iter().enumerate() {
        match &param.value {
            Some(value) => debug_log!("ecpg_free_params on line {line}: parameter {} = {}", i + 1, String::from_utf8_lossy(value)),
            None => debug_log!("ecpg_free_params on line {line}: parameter {} = null", i + 1),
        }
    }

    let result = sqlca::check_result(line, result, wire, q.compat)?;

    if let Some(prepare_name) = &prepare_name {
        statement::register(line, &mut inner, prepare_name, &command);
    }

    let out = {
        span!("process_output");
        process_output(q, &mut inner, result)
    };
    drain_notifies(line, &mut inner);
    out
}

/// Text of a character input, used as a statement name.
fn input_text(var: &Variable) -> Option<String> {
    match &var.value {
        HostValue::Char(c) | HostValue::UChar(c) | HostValue::String(c) => {
            Some(String::from_utf8_lossy(c.record_str(0)).into_owned())
        }
        HostValue::Varchar(s) => s.get(0).map(|v| v.as_str().to_owned()),
        HostValue::CharVariable(s) | HostValue::Const(s) => Some((*s).to_owned()),
        _ => None,
    }
}

/// Marshal every input and place it at its placeholder.
///
/// Descriptor and SQLDA inputs expand to one placeholder per item.
/// Character variables and `$0` are written into the command text, as is
/// every input of `EXECUTE name(expr, ...)`. Other inputs become parameters
/// and their placeholder is renumbered.
fn build_params(
    q: &Query,
    kind: StatementType,
    mut command: String,
    std_strings: bool,
) -> Result<(String, Vec<Param>)> {
    let line = q.line;
    let mut params = vec![];
    let mut counter = 1;
    let mut desc_counter = 0;
    let mut position = 0;
    let mut i = 0;

    while let Some(var) = q.inputs.get(i) {
        let value = match &var.value {
            HostValue::Descriptor(desc) => {
                desc_counter += 1;
                let (count, items) = descriptor::input_items(line, desc)?;
                let value = match items.iter().find(|item| item.num == desc_counter) {
                    Some(item) => descriptor_input(line, q.force_indicator, item)?,
                    None => None,
                };
                if count <= desc_counter {
                    desc_counter = 0;
                }
                value
            }
            HostValue::Sqlda(SqldaSlot::Input(sqlda)) => {
                desc_counter += 1;
                let sqld = sqlda.sqld() as i32;
                let value = match desc_counter <= sqld {
                    true => sqlda.store_input(line, (desc_counter - 1) as usize, q.force_indicator)?,
                    false => None,
                };
                if sqld <= desc_counter {
                    desc_counter = 0;
                }
                value
            }
            _ => encode::store_input(line, q.force_indicator, var, kind == StatementType::ExecWithExprList)?,
        };

        let Some(ph) = sql::next_insert(&command, position, q.questionmarks, std_strings) else {
            return Err(raise(line, code::TOO_MANY_ARGUMENTS, state::USING_CLAUSE_DOES_NOT_MATCH_PARAMETERS, None));
        };

        let inline = || value.clone().unwrap_or_else(|| "null".to_owned());

        let text = match (&var.value, ph.kind) {
            (HostValue::CharVariable(_), _) => inline(),
            (_, PlaceholderKind::Zero) => match kind {
                StatementType::Prepare | StatementType::ExecWithExprList => format!("\"{}\"", inline()),
                _ => inline(),
            },
            _ if kind == StatementType::ExecWithExprList => inline(),
            _ => {
                params.push(match &value {
                    Some(v) => Param::text(v.as_str()),
                    None => Param::null(),
                });
                let text = format!("${counter}");
                counter += 1;
                text
            }
        };

        verbose!("placeholder {:?} at {} replaced with {text}", ph.kind, ph.start);
        command.replace_range(ph.start..ph.end, &text);
        position = ph.start + text.len();

        if desc_counter == 0 {
            i += 1;
        }
    }

    if kind != StatementType::Prepare && sql::next_insert(&command, position, q.questionmarks, std_strings).is_some() {
        return Err(raise(line, code::TOO_FEW_ARGUMENTS, state::USING_CLAUSE_DOES_NOT_MATCH_PARAMETERS, None));
    }

    Ok((command, params))
}

/// Marshal one descriptor item, its indicator applies when nonzero.
fn descriptor_input(line: i32, force_indicator: bool, item: &DescriptorItem) -> Result<Option<String>> {
    let Some(data) = &item.data else {
        return Ok(None);
    };

    let ind = [item.indicator];
    let mut var = Variable::new(HostValue::Char(Chars::input_str(data)));
    if item.indicator != 0 {
        var.indicator = Indicator::Int(Slot::Input(&ind));
    }
    encode::store_input(line, force_indicator, &var, false)
}

/// Classify a result column, asking the server about unknown types.
fn classify(line: i32, compat: Compat, inner: &mut Inner, oid: Oid, ty: Type) -> Result<ArrayKind> {
    let Inner { wire, types, .. } = inner;

    pg_type::classify(types, oid, ty, |sql| {
        let Some(wire) = wire.as_deref_mut() else {
            return Ok(None);
        };
        let result = wire.exec(sql);
        let result = sqlca::check_result(line, result, wire, compat)?;
        if result.ntuples() == 0 {
            return Ok(None);
        }
        let typlen = std::str::from_utf8(result.get_value(0, 0)).ok().and_then(|v| v.trim().parse().ok());
        Ok(Some(typlen.unwrap_or(0)))
    })
}

/// Scatter the columns of `result` into the outputs in order.
///
/// `filled` counts the outputs handed to the scatter, so a failure only
/// releases storage this statement allocated.
fn scatter(q: &mut Query, inner: &mut Inner, result: &PgResult, filled: &mut usize) -> Result<()> {
    let line = q.line;
    let compat = q.compat;
    let ctx = Context { line, compat, force_indicator: q.force_indicator };
    let mut vars = q.outputs.iter_mut();

    for col in 0..result.nfields() {
        match vars.next() {
            Some(var) => {
                let kind = classify(line, compat, inner, result.ftype(col), var.ty())?;
                *filled += 1;
                row::store_result(&ctx, result, col, kind, var)?;
            }
            None if compat.is_informix() => { }
            None => {
                return Err(raise(line, code::TOO_FEW_ARGUMENTS, state::USING_CLAUSE_DOES_NOT_MATCH_TARGETS, None));
            }
        }
    }

    if vars.next().is_some() {
        return Err(raise(line, code::TOO_MANY_ARGUMENTS, state::USING_CLAUSE_DOES_NOT_MATCH_TARGETS, None));
    }

    Ok(())
}

fn process_output(q: &mut Query, inner: &mut Inner, result: PgResult) -> Result<()> {
    let line = q.line;
    let compat = q.compat;

    match result.status() {
        ResultStatus::TuplesOk => {
            let ntuples = result.ntuples();
            let nfields = result.nfields();
            sqlca::with(|ca| ca.sqlerrd[2] = ntuples as i64);

            debug_log!("ecpg_process_output on line {line}: correctly got {ntuples} tuples with {nfields} fields");

            if ntuples < 1 {
                return Err(raise(line, code::NOT_FOUND, state::NO_DATA, None));
            }

            match q.outputs.first_mut().map(|v| &mut v.value) {
                Some(HostValue::Descriptor(desc)) => {
                    debug_log!("ecpg_process_output on line {line}: putting result ({ntuples} tuples) into descriptor {desc}");
                    return descriptor::set_result(line, desc, result);
                }
                Some(HostValue::Sqlda(SqldaSlot::Output(slot))) => {
                    **slot = None;
                    let mut chain = None;
                    for row in (0..ntuples).rev() {
                        let mut sqlda = Sqlda::build(line, &result, Some(row), compat)?;
                        sqlda.set(line, &result, row, compat)?;
                        sqlda.set_next(chain.take());
                        chain = Some(Box::new(sqlda));
                        debug_log!("ecpg_process_output on line {line}: new sqlda was built");
                    }
                    **slot = chain;
                    return Ok(());
                }
                _ => { }
            }

            let mut filled = 0;
            let scattered = scatter(q, inner, &result, &mut filled);
            if scattered.is_err() {
                for var in &mut q.outputs[..filled] {
                    row::release(var);
                }
            }
            scattered
        }
        ResultStatus::CommandOk => {
            let tuples = result.cmd_tuples();
            let status = result.cmd_status();
            debug_log!("ecpg_process_output on line {line}: OK: {status}");

            sqlca::with(|ca| {
                ca.sqlerrd[1] = result.oid_value() as i64;
                ca.sqlerrd[2] = tuples as i64;
            });

            let modifies = ["UPDATE", "INSERT", "DELETE"].iter().any(|tag| status.starts_with(tag));
            if compat != Compat::InformixSe && tuples == 0 && modifies {
                // recorded in the diagnostics area, the statement still succeeds
                let _ = raise(line, code::NOT_FOUND, state::NO_DATA, None);
            }

            Ok(())
        }
        ResultStatus::CopyOut => {
            let wire = inner.wire(line)?;
            let mut stdout;
            let sink: &mut dyn Write = match q.copy.as_deref_mut() {
                Some(sink) => sink,
                None => {
                    stdout = io::stdout().lock();
                    &mut stdout
                }
            };

            loop {
                match wire.get_copy_data() {
                    CopyData::Row(row) => {
                        if let Err(err) = sink.write_all(&row) {
                            debug_log!("ecpg_process_output on line {line}: could not write copy data: {err}");
                        }
                    }
                    CopyData::Done => {
                        match wire.get_result() {
                            Some(_) => debug_log!("ecpg_process_output on line {line}: got PGRES_COMMAND_OK after PGRES_COPY_OUT"),
                            None => debug_log!("ecpg_process_output on line {line}: {}", wire.error_message()),
                        }
                        break;
                    }
                    CopyData::Failed => {
                        debug_log!("ecpg_process_output on line {line}: {}", wire.error_message());
                        break;
                    }
                }
            }

            if let Err(err) = sink.flush() {
                debug_log!("ecpg_process_output on line {line}: could not flush copy data: {err}");
            }
            Ok(())
        }
        status => {
            debug_log!("ecpg_process_output on line {line}: unknown execution status type {status:?}");
            Err(raise_status(line, compat, inner, &result))
        }
    }
}

fn raise_status(line: i32, compat: Compat, inner: &mut Inner, result: &PgResult) -> crate::Error {
    match inner.wire.as_deref() {
        Some(wire) => sqlca::raise_backend(line, Some(result), wire, compat),
        None => raise(line, code::NOT_CONN, state::INTERNAL_ERROR, Some(&inner.name)),
    }
}

/// Log and drop pending asynchronous notifications.
fn drain_notifies(line: i32, inner: &mut Inner) {
    let Some(wire) = inner.wire.as_deref_mut() else {
        return;
    };
    while let Some(notify) = wire.notifies() {
        debug_log!(
            "ecpg_process_output on line {line}: asynchronous notification of \"{}\" from backend with PID {} received",
            notify.channel,
            notify.pid,
        );
    }
}
