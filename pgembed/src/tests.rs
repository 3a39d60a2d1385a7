//! End to end statement runs against a scripted wire.
use crate::{
    cache,
    connection::disconnect,
    cursor,
    descriptor::{self, DescItem},
    postgres::{PgResult, ResultStatus, pg_type},
    query::{StatementType, query},
    sqlca::{self, code},
    statement,
    testing,
    types::{Date, Numeric},
    value::{Chars, Compat, HostValue, Indicator, NoIndNull, Slot, SqldaSlot, Type, Variable},
};

fn tuples(fields: &[(&str, u32)], rows: &[&[Option<&str>]]) -> PgResult {
    let mut builder = PgResult::builder(ResultStatus::TuplesOk);
    for (name, oid) in fields {
        builder = builder.field(name, *oid);
    }
    for row in rows {
        builder = builder.row(row.iter().copied());
    }
    builder.build()
}

fn assert_success() {
    let ca = sqlca::get();
    assert_eq!(ca.sqlcode, 0);
    assert_eq!(ca.sqlstate_str(), "00000");
}

#[test]
fn test_connect_and_select() {
    let log = testing::open("C1", Compat::Pgsql, true);
    log.on(
        "select id, v from t",
        tuples(&[("id", pg_type::INT4), ("v", pg_type::TEXT)], &[
            &[Some("1"), Some("a")],
            &[Some("2"), None],
            &[Some("3"), Some("c")],
        ]),
    );

    query(1, "CREATE TABLE t(id int, v text)").execute().unwrap();
    assert_success();
    query(2, "INSERT INTO t VALUES (1,'a'),(2,null),(3,'c')").execute().unwrap();
    assert_success();

    let mut id = [0i32; 3];
    let mut v = Vec::new();
    let mut ind = [9i16; 3];
    query(3, "SELECT id, v FROM t ORDER BY id")
        .output(HostValue::Int(Slot::Array(&mut id)))
        .output(Variable::new(HostValue::Char(Chars::pointer(&mut v))).with_indicator(Indicator::Short(Slot::Array(&mut ind))))
        .execute()
        .unwrap();

    assert_success();
    assert_eq!(sqlca::get().sqlerrd[2], 3);
    assert_eq!(id, [1, 2, 3]);
    assert_eq!(ind, [0, -1, 0]);
    let v = Chars::pointer(&mut v);
    assert_eq!(v.record(0), b"a");
    assert_eq!(v.record(2), b"c");

    disconnect(4, "C1").unwrap();
}

#[test]
fn test_truncation() {
    let log = testing::open("scenario_truncation", Compat::Pgsql, true);
    log.on("abcdefghij", tuples(&[("varchar", pg_type::VARCHAR)], &[&[Some("ABCDEFGHIJ")]]));

    let mut buf = [0u8; 5];
    let mut ind = [0i16];
    query(1, "SELECT 'ABCDEFGHIJ'::varchar(10)")
        .output(Variable::new(HostValue::Char(Chars::array(&mut buf, 5))).with_indicator(Indicator::Short(Slot::Array(&mut ind))))
        .execute()
        .unwrap();

    assert_eq!(&buf, b"ABCDE");
    assert_eq!(ind, [10]);
    assert_eq!(sqlca::get().sqlwarn[1], b'W');
    assert_eq!(sqlca::get().sqlcode, 0);

    disconnect(2, "scenario_truncation").unwrap();
}

#[test]
fn test_informix_numeric_tolerance() {
    let log = testing::open("scenario_informix", Compat::Informix, true);
    log.on("notanumber", tuples(&[("text", pg_type::TEXT)], &[&[Some("notanumber")]]));

    let mut n = [Numeric::new()];
    query(1, "SELECT 'notanumber'")
        .compat(Compat::Informix)
        .force_indicator(false)
        .output(HostValue::Numeric(Slot::Array(&mut n)))
        .execute()
        .unwrap();

    assert_eq!(sqlca::get().sqlcode, 0);
    assert!(n[0].is_noind_null());

    disconnect(2, "scenario_informix").unwrap();
}

#[test]
fn test_cursor_lifecycle() {
    let log = testing::open("scenario_cursor", Compat::Pgsql, true);
    for value in ["1", "2", "3", "4"] {
        log.once("fetch 1 from scenario_c", tuples(&[("generate_series", pg_type::INT4)], &[&[Some(value)]]));
    }
    log.on("fetch 1 from scenario_c", tuples(&[("generate_series", pg_type::INT4)], &[]));

    cursor::open("scenario_c", None, query(1, "declare scenario_c cursor for select generate_series(1,4)")).unwrap();

    let mut seen = vec![];
    for line in 2..7 {
        let mut v = [0i32];
        let result = cursor::fetch("scenario_c", query(line, "fetch 1 from scenario_c").output(HostValue::Int(Slot::Array(&mut v))));
        match result {
            Ok(()) => seen.push(v[0]),
            Err(err) => {
                assert!(err.is_not_found());
                assert_eq!(sqlca::get().sqlcode, code::NOT_FOUND);
                assert_eq!(sqlca::get().sqlstate_str(), "02000");
            }
        }
    }
    assert_eq!(seen, [1, 2, 3, 4]);

    cursor::close("scenario_c", query(8, "close scenario_c")).unwrap();
    assert_success();

    // closed cursors are unknown
    let err = cursor::close("scenario_c", query(9, "close scenario_c")).unwrap_err();
    assert_eq!(err.sqlcode(), code::WARNING_UNKNOWN_PORTAL);

    disconnect(10, "scenario_cursor").unwrap();
}

#[test]
fn test_auto_prepare_stability() {
    let log = testing::open("scenario_autoprep", Compat::Pgsql, true);
    let text = "insert into scenario_autoprep values ($1)";

    let mut names = vec![];
    for i in 1..=5 {
        let v = [i];
        query(i, text)
            .kind(StatementType::PrepNormal)
            .input(HostValue::Int(Slot::Input(&v)))
            .execute()
            .unwrap();

        let entry = cache::lookup(text).unwrap();
        assert_eq!(entry.execs, i as u64);
        names.push(entry.name);
    }

    assert!(names.iter().all(|n| *n == names[0]));
    assert_eq!(log.prepared().len(), 1);

    let params = log.params();
    assert_eq!(params.len(), 5);
    assert_eq!(params[4], (names[0].clone(), vec![Some("5".to_owned())]));

    disconnect(6, "scenario_autoprep").unwrap();
}

#[test]
fn test_sqlda_heterogeneous_columns() {
    let log = testing::open("scenario_sqlda", Compat::Pgsql, true);
    log.on(
        "now()::date",
        tuples(
            &[("int4", pg_type::INT4), ("text", pg_type::TEXT), ("numeric", pg_type::NUMERIC), ("now", pg_type::DATE), ("int8", pg_type::INT8)],
            &[&[Some("1"), Some("hi"), Some("1.5"), Some("2024-02-29"), None]],
        ),
    );

    let mut slot = None;
    query(1, "SELECT 1::int, 'hi'::text, 1.5::numeric, now()::date, NULL::bigint")
        .output(HostValue::Sqlda(SqldaSlot::Output(&mut slot)))
        .execute()
        .unwrap();

    let sqlda = slot.unwrap();
    assert_eq!(sqlda.sqld(), 5);
    assert!(sqlda.next().is_none());

    let v = sqlda.var(0).unwrap();
    assert_eq!(v.sqltype(), Type::Int);
    assert_eq!(v.as_i32(), Some(1));

    let v = sqlda.var(1).unwrap();
    assert_eq!(v.sqltype(), Type::Char);
    assert_eq!(v.as_str(), Some("hi"));

    let v = sqlda.var(2).unwrap();
    assert_eq!(v.sqltype(), Type::Numeric);
    assert_eq!(v.as_numeric().unwrap().to_asc(-1), "1.5");

    let v = sqlda.var(3).unwrap();
    assert_eq!(v.sqltype(), Type::Date);
    assert_eq!(v.as_date(), Some(Date::from_ymd(2024, 2, 29).unwrap()));

    assert_eq!(sqlda.var(4).unwrap().sqlind(), -1);

    for v in sqlda.vars() {
        if let Some(at) = v.data_offset() {
            assert!(at < sqlda.block_size());
        }
    }

    disconnect(2, "scenario_sqlda").unwrap();
}

#[test]
fn test_sqlda_chain_per_row() {
    let log = testing::open("scenario_sqlda_chain", Compat::Pgsql, true);
    log.on("from chain", tuples(&[("n", pg_type::INT4)], &[&[Some("1")], &[Some("2")], &[Some("3")]]));

    let mut slot = None;
    query(1, "select n from chain")
        .output(HostValue::Sqlda(SqldaSlot::Output(&mut slot)))
        .execute()
        .unwrap();

    let head = slot.unwrap();
    let values: Vec<_> = head.iter().map(|s| s.var(0).and_then(|v| v.as_i32())).collect();
    assert_eq!(values, [Some(1), Some(2), Some(3)]);

    // feed a block back as input
    query(2, "insert into chain values ($1)")
        .input(HostValue::Sqlda(SqldaSlot::Input(&head)))
        .execute()
        .unwrap();
    assert_eq!(log.params().last().unwrap().1, [Some("1".to_owned())]);

    disconnect(3, "scenario_sqlda_chain").unwrap();
}

#[test]
fn test_descriptor_output() {
    let log = testing::open("scenario_desc", Compat::Pgsql, true);
    log.on("from d", tuples(&[("a", pg_type::INT4), ("b", pg_type::TEXT)], &[&[Some("4"), None]]));

    descriptor::allocate_desc(1, "scenario_desc").unwrap();
    query(2, "select a, b from d")
        .output(HostValue::Descriptor("scenario_desc"))
        .execute()
        .unwrap();

    assert_eq!(descriptor::get_desc_header(3, "scenario_desc").unwrap(), 2);

    let mut a = [0i32];
    let mut ind = [0i32];
    descriptor::get_desc(4, "scenario_desc", 1, [(DescItem::Data, HostValue::Int(Slot::Array(&mut a)))]).unwrap();
    descriptor::get_desc(5, "scenario_desc", 2, [(DescItem::Indicator, HostValue::Int(Slot::Array(&mut ind)))]).unwrap();
    assert_eq!(a, [4]);
    assert_eq!(ind, [-1]);

    descriptor::deallocate_desc(6, "scenario_desc").unwrap();
    disconnect(7, "scenario_desc").unwrap();
}

#[test]
fn test_transaction_autostart() {
    let log = testing::open("scenario_autostart", Compat::Pgsql, false);

    query(1, "insert into t values (1)").execute().unwrap();
    query(2, "insert into t values (2)").execute().unwrap();

    let executed = log.executed();
    assert_eq!(executed.iter().filter(|c| *c == "begin transaction").count(), 1);
    assert_eq!(executed.first().map(String::as_str), Some("begin transaction"));

    disconnect(3, "scenario_autostart").unwrap();
}

#[test]
fn test_command_without_rows() {
    let log = testing::open("scenario_update", Compat::Pgsql, true);
    log.on("update t", PgResult::builder(ResultStatus::CommandOk).command("UPDATE 0").build());
    log.on("delete from t", PgResult::builder(ResultStatus::CommandOk).command("DELETE 2").build());

    query(1, "update t set a = 1").execute().unwrap();
    assert_eq!(sqlca::get().sqlcode, code::NOT_FOUND);

    query(2, "delete from t").execute().unwrap();
    assert_success();
    assert_eq!(sqlca::get().sqlerrd[2], 2);

    // informix se reports success
    query(3, "update t set a = 1").compat(Compat::InformixSe).execute().unwrap();
    assert_eq!(sqlca::get().sqlcode, 0);

    disconnect(4, "scenario_update").unwrap();
}

#[test]
fn test_output_count_mismatch() {
    let log = testing::open("scenario_mismatch", Compat::Pgsql, true);
    log.on("from pair", tuples(&[("a", pg_type::INT4), ("b", pg_type::INT4)], &[&[Some("1"), Some("2")]]));

    let mut a = [0i32];
    let err = query(1, "select a, b from pair").output(HostValue::Int(Slot::Array(&mut a))).execute().unwrap_err();
    assert_eq!(err.sqlcode(), code::TOO_FEW_ARGUMENTS);
    assert_eq!(sqlca::get().sqlstate_str(), "07002");

    let mut a = [0i32];
    query(2, "select a, b from pair")
        .compat(Compat::Informix)
        .output(HostValue::Int(Slot::Array(&mut a)))
        .execute()
        .unwrap();
    assert_eq!(a, [1]);

    let (mut a, mut b, mut c) = ([0i32], [0i32], [0i32]);
    let err = query(3, "select a, b from pair")
        .output(HostValue::Int(Slot::Array(&mut a)))
        .output(HostValue::Int(Slot::Array(&mut b)))
        .output(HostValue::Int(Slot::Array(&mut c)))
        .execute()
        .unwrap_err();
    assert_eq!(err.sqlcode(), code::TOO_MANY_ARGUMENTS);

    disconnect(4, "scenario_mismatch").unwrap();
}

#[test]
fn test_prepared_statements() {
    let log = testing::open("scenario_prepare", Compat::Pgsql, true);

    statement::prepare(1, None, "scenario_s", "select :a").unwrap();
    let v = [5i32];
    query(2, "scenario_s")
        .kind(StatementType::Execute)
        .input(HostValue::Int(Slot::Input(&v)))
        .execute()
        .unwrap();
    assert_eq!(log.params().last().unwrap(), &("scenario_s".to_owned(), vec![Some("5".to_owned())]));

    let err = query(3, "scenario_unknown").kind(StatementType::Execute).execute().unwrap_err();
    assert_eq!(err.sqlcode(), code::INVALID_STMT);
    assert_eq!(sqlca::get().sqlstate_str(), "26000");

    query(4, "prepare $0 as select $1")
        .kind(StatementType::Prepare)
        .input(HostValue::Const("scenario_p"))
        .execute()
        .unwrap();
    assert!(log.executed().contains(&"prepare \"scenario_p\" as select $1".to_owned()));
    assert_eq!(
        statement::prepared_statement(None, "scenario_p").as_deref(),
        Some("prepare \"scenario_p\" as select $1")
    );

    disconnect(5, "scenario_prepare").unwrap();
}

#[test]
fn test_copy_and_notifications() {
    let log = testing::open("scenario_copy", Compat::Pgsql, true);
    log.copy_out("copy t to stdout", &["1\ta\n", "2\tb\n"]);
    log.on("copy t from stdin", PgResult::empty(ResultStatus::CopyIn));
    log.notify("events", "ping");

    let mut sink = Vec::new();
    query(1, "copy t to stdout").copy_to(&mut sink).execute().unwrap();
    assert_eq!(sink, b"1\ta\n2\tb\n");
    assert_eq!(log.pending_notifies(), 0);

    let err = query(2, "copy t from stdin").execute().unwrap_err();
    assert_eq!(err.sqlcode(), code::UNSUPPORTED);
    assert!(log.copy_ended().is_some());

    disconnect(3, "scenario_copy").unwrap();
}

#[test]
fn test_failure_releases_scattered_outputs() {
    let log = testing::open("scenario_release", Compat::Pgsql, true);
    log.on("selec ", PgResult::builder(ResultStatus::FatalError).error("42601", "syntax error at or near \"selec\"").build());
    log.on("from bad", tuples(&[("a", pg_type::INT4), ("b", pg_type::INT4)], &[&[Some("1"), Some("x")]]));

    // the statement failed before anything was scattered
    let mut v = vec![1i64, 2];
    query(1, "selec 1").output(HostValue::Long(Slot::Pointer(&mut v))).execute().unwrap_err();
    assert_eq!(v, [1, 2]);

    let (mut a, mut b, mut c) = (vec![9i32], vec![9i32], vec![9i32]);
    let err = query(2, "select a, b from bad")
        .output(HostValue::Int(Slot::Pointer(&mut a)))
        .output(HostValue::Int(Slot::Pointer(&mut b)))
        .output(HostValue::Int(Slot::Pointer(&mut c)))
        .execute()
        .unwrap_err();
    assert_eq!(err.sqlcode(), code::INT_FORMAT);
    assert!(a.is_empty());
    assert!(b.is_empty());
    assert_eq!(c, [9]);

    disconnect(3, "scenario_release").unwrap();
}

#[test]
fn test_failure_fills_diagnostics() {
    let log = testing::open("scenario_failure", Compat::Pgsql, true);
    log.on("selec ", PgResult::builder(ResultStatus::FatalError).error("42601", "syntax error at or near \"selec\"").build());

    let mut v = Vec::new();
    let err = query(7, "selec 1").output(HostValue::Long(Slot::Pointer(&mut v))).execute().unwrap_err();
    assert_eq!(err.sqlcode(), code::PGSQL);

    let ca = sqlca::get();
    assert_eq!(ca.sqlstate_str(), "42601");
    assert!(!ca.message().is_empty());
    assert_eq!(ca.message().len(), ca.sqlerrm.sqlerrml as usize);
    assert!(ca.message().ends_with("on line 7"));

    let err = query(8, "select 1").connection("scenario_missing").execute().unwrap_err();
    assert_eq!(err.sqlcode(), code::NO_CONN);

    disconnect(9, "scenario_failure").unwrap();
}
