use std::sync::Arc;

use crate::convert::{ConversionEdge, ConversionGraph};
use crate::dispatch::{DispatchTable, Implementation};
use crate::error::TypedError;
use crate::signature::Signature;
use crate::types::{TypeDescriptor, TypeRegistry};

/// Minimal dynamic value for exercising the engine.
#[derive(Clone, Debug, PartialEq)]
enum Val {
	Num(f64),
	Bool(bool),
	Str(String),
	List(Vec<Val>),
}

fn registry() -> TypeRegistry<Val> {
	let mut reg = TypeRegistry::new();
	reg.register(TypeDescriptor::new("number", |v: &Val| {
		matches!(v, Val::Num(_))
	}))
	.unwrap();
	reg.register(TypeDescriptor::new("boolean", |v: &Val| {
		matches!(v, Val::Bool(_))
	}))
	.unwrap();
	reg.register(TypeDescriptor::new("string", |v: &Val| {
		matches!(v, Val::Str(_))
	}))
	.unwrap();
	reg.register(TypeDescriptor::new("list", |v: &Val| {
		matches!(v, Val::List(_))
	}))
	.unwrap();
	reg
}

fn graph() -> ConversionGraph<Val> {
	let mut g = ConversionGraph::new();
	g.register(ConversionEdge::new("boolean", "number", |v: &Val| match v {
		Val::Bool(b) => Ok(Val::Num(if *b { 1.0 } else { 0.0 })),
		_ => Err("not a boolean".into()),
	}));
	g.register(ConversionEdge::new("number", "string", |v: &Val| match v {
		Val::Num(n) => Ok(Val::Str(n.to_string())),
		_ => Err("not a number".into()),
	}));
	g.register(
		ConversionEdge::new("string", "number", |v: &Val| match v {
			Val::Str(s) => s
				.parse::<f64>()
				.map(Val::Num)
				.map_err(|_| format!("cannot convert \"{s}\" to a number")),
			_ => Err("not a string".into()),
		})
		.fallible(),
	);
	g
}

fn impl_of(f: impl Fn(&[Val]) -> Val + Send + Sync + 'static) -> Implementation<Val> {
	Arc::new(move |args| Ok(f(args)))
}

fn table(signatures: Vec<(&str, Implementation<Val>)>) -> DispatchTable<Val> {
	DispatchTable::compile(
		"op",
		signatures,
		Arc::new(registry()),
		Arc::new(graph()),
	)
	.unwrap()
}

/// Classification tries descriptors in registration order and reports the
/// first match.
#[test]
fn classify_first_match_wins() {
	let mut reg = TypeRegistry::new();
	reg.register(TypeDescriptor::new("anything", |_: &Val| true))
		.unwrap();
	reg.register(TypeDescriptor::new("number", |v: &Val| {
		matches!(v, Val::Num(_))
	}))
	.unwrap();

	// The broad descriptor shadows the narrow one entirely.
	assert_eq!(reg.classify(&Val::Num(1.0)).unwrap(), "anything");
}

/// Registering two descriptors under one name is rejected.
#[test]
fn classify_duplicate_name_rejected() {
	let mut reg = registry();
	let err = reg
		.register(TypeDescriptor::new("number", |_: &Val| true))
		.unwrap_err();
	assert!(matches!(err, TypedError::DuplicateType(name) if &*name == "number"));
}

/// A value matching no descriptor raises UnclassifiedValue.
#[test]
fn classify_unmatched_value_fails() {
	let mut reg = TypeRegistry::new();
	reg.register(TypeDescriptor::new("number", |v: &Val| {
		matches!(v, Val::Num(_))
	}))
	.unwrap();

	let err = reg.classify(&Val::Bool(true)).unwrap_err();
	assert!(matches!(err, TypedError::UnclassifiedValue { count: 1 }));
}

/// Re-declaring a (from, to) pair overwrites the previous edge.
#[test]
fn conversion_last_registration_wins() {
	let mut g = ConversionGraph::new();
	g.register(ConversionEdge::new("boolean", "number", |_: &Val| {
		Ok(Val::Num(-1.0))
	}));
	g.register(ConversionEdge::new("boolean", "number", |v: &Val| match v {
		Val::Bool(b) => Ok(Val::Num(if *b { 1.0 } else { 0.0 })),
		_ => Err("not a boolean".into()),
	}));

	assert_eq!(g.len(), 1);
	let edge = g.path("boolean", "number").expect("edge present");
	assert_eq!(edge.apply(&Val::Bool(true)).unwrap(), Val::Num(1.0));
}

/// path() is single-hop: an indirect route through a middle type is not
/// found even when both hops exist.
#[test]
fn conversion_path_never_chains() {
	let g = graph();
	// boolean -> number and number -> string both exist; boolean -> string
	// does not, and must not be synthesized.
	assert!(g.path("boolean", "number").is_some());
	assert!(g.path("number", "string").is_some());
	assert!(g.path("boolean", "string").is_none());
}

/// A failing conversion surfaces as a typed error naming both endpoints.
#[test]
fn conversion_failure_is_typed() {
	let g = graph();
	let edge = g.path("string", "number").unwrap();
	assert!(edge.may_fail());

	let err = edge.apply(&Val::Str("pi".into())).unwrap_err();
	match err {
		TypedError::Conversion { from, to, cause } => {
			assert_eq!(&*from, "string");
			assert_eq!(&*to, "number");
			assert!(cause.contains("pi"));
		}
		other => panic!("unexpected error: {other:?}"),
	}
}

/// Signatures canonicalize whitespace and duplicate alternatives.
#[test]
fn signature_canonical_form() {
	let sig = Signature::parse("  number ,string|boolean |string ").unwrap();
	assert_eq!(sig.canonical(), "number, string | boolean");

	let rest = Signature::parse("number, ...string | boolean").unwrap();
	assert_eq!(rest.canonical(), "number, ...string | boolean");

	let empty = Signature::parse("").unwrap();
	assert_eq!(empty.canonical(), "");
	assert!(empty.accepts_arity(0));
	assert!(!empty.accepts_arity(1));
}

/// Rest parameters govern arity and all trailing positions.
#[test]
fn signature_rest_parameter() {
	let sig = Signature::parse("number, ...string").unwrap();
	assert!(sig.accepts_arity(1));
	assert!(sig.accepts_arity(4));
	assert!(!sig.accepts_arity(0));

	assert!(sig.param_at(0).unwrap().accepts("number"));
	assert!(sig.param_at(3).unwrap().accepts("string"));
	assert!(!sig.param_at(3).unwrap().accepts("number"));
}

/// Malformed signatures are rejected with a reason.
#[test]
fn signature_parse_errors() {
	for raw in ["number,,string", "...number, string", "num ber", "a, ..."] {
		let err = Signature::parse(raw).unwrap_err();
		assert!(
			matches!(err, TypedError::InvalidSignature { .. }),
			"{raw} should be invalid"
		);
	}
}

/// Compiling a signature naming an unregistered type fails.
#[test]
fn compile_rejects_unknown_type() {
	let err = DispatchTable::compile(
		"op",
		vec![("matrix", impl_of(|_| Val::Num(0.0)))],
		Arc::new(registry()),
		Arc::new(graph()),
	)
	.unwrap_err();
	assert!(matches!(err, TypedError::InvalidSignature { .. }));
}

/// An exact signature match routes without conversions.
#[test]
fn call_exact_match() {
	let t = table(vec![
		(
			"number, number",
			impl_of(|args| match (&args[0], &args[1]) {
				(Val::Num(a), Val::Num(b)) => Val::Num(a + b),
				_ => unreachable!(),
			}),
		),
		("string", impl_of(|_| Val::Str("str".into()))),
	]);

	assert_eq!(
		t.call(&[Val::Num(2.0), Val::Num(3.0)]).unwrap(),
		Val::Num(5.0)
	);
	assert_eq!(t.call(&[Val::Str("x".into())]).unwrap(), Val::Str("str".into()));
}

/// No exact match for a number against a string-only table, but the
/// number -> string edge bridges it.
#[test]
fn call_single_conversion_match() {
	let t = table(vec![(
		"string",
		impl_of(|args| match &args[0] {
			Val::Str(s) => Val::Str(format!("got {s}")),
			_ => unreachable!(),
		}),
	)]);

	assert_eq!(t.call(&[Val::Num(5.0)]).unwrap(), Val::Str("got 5".into()));
}

/// Candidates converting fewer arguments win over candidates converting
/// more, regardless of registration order.
#[test]
fn call_prefers_fewer_conversions() {
	let t = table(vec![
		("string, string", impl_of(|_| Val::Str("both".into()))),
		("string, number", impl_of(|_| Val::Str("one".into()))),
	]);

	// (number, number): first candidate needs two conversions, second one.
	assert_eq!(
		t.call(&[Val::Num(1.0), Val::Num(2.0)]).unwrap(),
		Val::Str("one".into())
	);
}

/// At equal conversion counts, the candidate reachable through the
/// earliest-declared edge wins, regardless of signature order.
#[test]
fn call_tie_breaks_on_edge_declaration_order() {
	let mut g = ConversionGraph::new();
	g.register(ConversionEdge::new("boolean", "string", |v: &Val| match v {
		Val::Bool(b) => Ok(Val::Str(b.to_string())),
		_ => Err("not a boolean".into()),
	}));
	g.register(ConversionEdge::new("boolean", "number", |v: &Val| match v {
		Val::Bool(b) => Ok(Val::Num(if *b { 1.0 } else { 0.0 })),
		_ => Err("not a boolean".into()),
	}));

	let t = DispatchTable::compile(
		"op",
		vec![
			("number", impl_of(|_| Val::Str("via-number".into()))),
			("string", impl_of(|_| Val::Str("via-string".into()))),
		],
		Arc::new(registry()),
		Arc::new(g),
	)
	.unwrap();

	// Both candidates need exactly one conversion from boolean; the
	// boolean -> string edge was declared first, so "string" wins even
	// though "number" was registered first.
	assert_eq!(t.call(&[Val::Bool(true)]).unwrap(), Val::Str("via-string".into()));
}

/// A conversion plan that fails at apply time surfaces the conversion
/// error, not a no-match error.
#[test]
fn call_conversion_failure_propagates() {
	let t = table(vec![("number", impl_of(|_| Val::Num(0.0)))]);

	let err = t.call(&[Val::Str("pi".into())]).unwrap_err();
	assert!(matches!(err, TypedError::Conversion { .. }));
}

/// An unreachable call reports the offered types and every available
/// signature for diagnostics.
#[test]
fn call_no_match_lists_signatures() {
	let t = table(vec![
		("number", impl_of(|_| Val::Num(0.0))),
		("number, number", impl_of(|_| Val::Num(0.0))),
	]);

	let err = t.call(&[Val::List(vec![])]).unwrap_err();
	match err {
		TypedError::NoMatchingSignature {
			name,
			provided,
			available,
		} => {
			assert_eq!(&*name, "op");
			assert_eq!(provided, vec![Box::from("list")]);
			assert_eq!(
				available,
				vec![Box::from("number"), Box::from("number, number")]
			);
		}
		other => panic!("unexpected error: {other:?}"),
	}
}

/// Implementation errors are wrapped with the table name and kept as the
/// source.
#[test]
fn call_execution_error_wrapped() {
	let failing: Implementation<Val> =
		Arc::new(|_| Err("domain explosion".to_string().into()));
	let t = table(vec![("number", failing)]);

	let err = t.call(&[Val::Num(1.0)]).unwrap_err();
	match err {
		TypedError::Execution { name, cause } => {
			assert_eq!(&*name, "op");
			assert_eq!(cause.to_string(), "domain explosion");
		}
		other => panic!("unexpected error: {other:?}"),
	}
}

/// Merging disjoint tables yields exactly the union, and calls previously
/// routable through either side still route identically.
#[test]
fn merge_disjoint_union() {
	let a = table(vec![("number", impl_of(|_| Val::Str("a".into())))]);
	let b = table(vec![("string", impl_of(|_| Val::Str("b".into())))]);

	let merged = a.merge(&b, false).unwrap();
	assert_eq!(merged.signatures(), vec!["number", "string"]);
	assert_eq!(merged.call(&[Val::Num(1.0)]).unwrap(), Val::Str("a".into()));
	assert_eq!(
		merged.call(&[Val::Str("x".into())]).unwrap(),
		Val::Str("b".into())
	);
}

/// An overlapping merge without override is rejected; with override the
/// later table's implementation wins for the overlap only.
#[test]
fn merge_overlap_requires_override() {
	let a = table(vec![
		("number", impl_of(|_| Val::Str("a".into()))),
		("boolean", impl_of(|_| Val::Str("a-bool".into()))),
	]);
	let b = table(vec![("number", impl_of(|_| Val::Str("b".into())))]);

	let err = a.merge(&b, false).unwrap_err();
	assert!(matches!(err, TypedError::DuplicateSignature { .. }));

	let merged = a.merge(&b, true).unwrap();
	assert_eq!(merged.len(), 2);
	assert_eq!(merged.call(&[Val::Num(1.0)]).unwrap(), Val::Str("b".into()));
	assert_eq!(
		merged.call(&[Val::Bool(true)]).unwrap(),
		Val::Str("a-bool".into())
	);
}

/// Equivalent signature spellings collapse to one canonical key, so they
/// collide on merge.
#[test]
fn merge_detects_spelling_variants() {
	let a = table(vec![("number|boolean", impl_of(|_| Val::Num(1.0)))]);
	let b = table(vec![("number | boolean", impl_of(|_| Val::Num(2.0)))]);

	assert!(a.merge(&b, false).is_err());
}

/// to_primitive reduces values whose descriptor declares a reduction and
/// passes everything else through.
#[test]
fn registry_to_primitive() {
	let mut reg = registry();
	reg.register(
		TypeDescriptor::new("wrapped", |v: &Val| {
			matches!(v, Val::List(items) if items.len() == 1)
		})
		.with_primitive(|v: &Val| match v {
			Val::List(items) => items[0].clone(),
			_ => v.clone(),
		}),
	)
	.unwrap();

	// "list" is registered before "wrapped" and has no reduction.
	assert_eq!(
		reg.to_primitive(&Val::List(vec![Val::Num(7.0)])),
		Val::List(vec![Val::Num(7.0)])
	);
	assert_eq!(reg.to_primitive(&Val::Num(7.0)), Val::Num(7.0));
}
