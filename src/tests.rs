use std::collections::BTreeMap;

use bytes::Bytes;

use super::decode::{decode_integer, decode_string};
use super::*;

#[derive(Debug, PartialEq)]
struct Student {
    name: String,
    sid: i64,
}

bencode_aggregate!(Student { name, sid });

#[derive(Debug, PartialEq)]
struct Roster {
    label: String,
    students: Vec<Student>,
}

bencode_aggregate!(Roster { label, students });

// Hand-written descriptor pair, exercising the same façade the macro
// expansion uses.
#[derive(Debug, PartialEq)]
struct Span {
    start: i64,
    end: i64,
}

impl ToBencode for Span {
    fn to_node(&self, tree: &mut Tree) -> Result<NodeId, BencodeError> {
        let mut scope = Scope::new(tree);
        scope.select("start").assign(&self.start)?;
        scope.select("end").assign(&self.end)?;
        Ok(scope.node())
    }
}

impl FromBencode for Span {
    fn from_node(tree: &Tree, id: NodeId) -> Result<Self, BencodeError> {
        let scope = ScopeRef::bind(tree, id)?;
        Ok(Span {
            start: scope.select("start").retrieve()?,
            end: scope.select("end").retrieve()?,
        })
    }
}

fn root_of(tree: &Tree) -> NodeId {
    tree.root().expect("decoded tree has a root")
}

#[test]
fn test_decode_integer() {
    let tree = decode(b"i42e").unwrap();
    assert_eq!(tree.as_integer(root_of(&tree)).unwrap(), 42);

    let tree = decode(b"i-42e").unwrap();
    assert_eq!(tree.as_integer(root_of(&tree)).unwrap(), -42);

    let tree = decode(b"i0e").unwrap();
    assert_eq!(tree.as_integer(root_of(&tree)).unwrap(), 0);
}

#[test]
fn test_decode_integer_invalid() {
    assert!(matches!(
        decode(b"i-0e").unwrap_err(),
        BencodeError::Invalid(_)
    ));
    assert!(matches!(
        decode(b"i03e").unwrap_err(),
        BencodeError::Invalid(_)
    ));
    assert!(matches!(
        decode(b"ie").unwrap_err(),
        BencodeError::ExpectedDigit
    ));
    assert!(matches!(
        decode(b"i e").unwrap_err(),
        BencodeError::ExpectedDigit
    ));
    assert!(matches!(
        decode(b"i42").unwrap_err(),
        BencodeError::ExpectedTerminator
    ));
}

#[test]
fn test_decode_integer_extremes() {
    let tree = decode(b"i-9223372036854775808e").unwrap();
    assert_eq!(tree.as_integer(root_of(&tree)).unwrap(), i64::MIN);

    let tree = decode(b"i9223372036854775807e").unwrap();
    assert_eq!(tree.as_integer(root_of(&tree)).unwrap(), i64::MAX);

    assert!(matches!(
        decode(b"i9223372036854775808e").unwrap_err(),
        BencodeError::Invalid(_)
    ));
    assert!(matches!(
        decode(b"i-9223372036854775809e").unwrap_err(),
        BencodeError::Invalid(_)
    ));
}

#[test]
fn test_decode_bytes() {
    let tree = decode(b"4:spam").unwrap();
    assert_eq!(
        tree.as_bytes(root_of(&tree)).unwrap(),
        &Bytes::from_static(b"spam")
    );

    let tree = decode(b"0:").unwrap();
    assert!(tree.as_bytes(root_of(&tree)).unwrap().is_empty());
}

#[test]
fn test_decode_bytes_truncated() {
    assert!(matches!(
        decode(b"5:spam").unwrap_err(),
        BencodeError::Invalid(_)
    ));
}

#[test]
fn test_decode_bytes_missing_colon() {
    assert!(matches!(
        decode(b"4spam").unwrap_err(),
        BencodeError::ExpectedColon
    ));
}

#[test]
fn test_decode_list() {
    let tree = decode(b"l4:spami42ee").unwrap();
    let items = tree.as_list(root_of(&tree)).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(tree.as_str(items[0]).unwrap(), "spam");
    assert_eq!(tree.as_integer(items[1]).unwrap(), 42);
}

#[test]
fn test_decode_empty_containers() {
    let tree = decode(b"le").unwrap();
    assert!(tree.as_list(root_of(&tree)).unwrap().is_empty());

    let tree = decode(b"de").unwrap();
    assert!(tree.as_dict(root_of(&tree)).unwrap().is_empty());
}

#[test]
fn test_decode_dict() {
    let tree = decode(b"d3:cow3:moo4:spam4:eggse").unwrap();
    let dict = tree.as_dict(root_of(&tree)).unwrap();
    assert_eq!(dict.len(), 2);
    assert_eq!(tree.as_str(dict[b"cow".as_slice()]).unwrap(), "moo");
    assert_eq!(tree.as_str(dict[b"spam".as_slice()]).unwrap(), "eggs");
}

#[test]
fn test_decode_dict_duplicate_key_first_wins() {
    let tree = decode(b"d1:ai1e1:ai2ee").unwrap();
    let dict = tree.as_dict(root_of(&tree)).unwrap();
    assert_eq!(dict.len(), 1);
    assert_eq!(tree.as_integer(dict[b"a".as_slice()]).unwrap(), 1);
}

#[test]
fn test_decode_dict_key_must_be_string() {
    assert!(matches!(
        decode(b"di1ei2ee").unwrap_err(),
        BencodeError::ExpectedDigit
    ));
}

#[test]
fn test_decode_missing_terminator() {
    assert!(matches!(
        decode(b"li1e").unwrap_err(),
        BencodeError::ExpectedTerminator
    ));
    assert!(matches!(
        decode(b"d3:fooi1e").unwrap_err(),
        BencodeError::ExpectedTerminator
    ));
}

#[test]
fn test_decode_unexpected_byte() {
    assert!(matches!(
        decode(b"x").unwrap_err(),
        BencodeError::Invalid(_)
    ));
}

#[test]
fn test_decode_empty_input() {
    assert!(matches!(decode(b"").unwrap_err(), BencodeError::Invalid(_)));
}

#[test]
fn test_trailing_data_error() {
    assert!(matches!(
        decode(b"i42eextra").unwrap_err(),
        BencodeError::TrailingData
    ));
}

#[test]
fn test_depth_limit_default() {
    let data = format!("{}{}", "l".repeat(66), "e".repeat(66));
    assert!(matches!(
        decode(data.as_bytes()).unwrap_err(),
        BencodeError::LimitExceeded(_)
    ));
}

#[test]
fn test_depth_limit_configured() {
    let limits = Limits {
        max_depth: 4,
        ..Limits::default()
    };
    let data = format!("{}{}", "l".repeat(6), "e".repeat(6));
    assert!(matches!(
        decode_with(data.as_bytes(), &limits).unwrap_err(),
        BencodeError::LimitExceeded(_)
    ));

    // One level inside the bound still decodes.
    let data = format!("{}{}", "l".repeat(5), "e".repeat(5));
    assert!(decode_with(data.as_bytes(), &limits).is_ok());
}

#[test]
fn test_string_length_limit() {
    let limits = Limits {
        max_string_len: 10,
        ..Limits::default()
    };
    assert!(matches!(
        decode_with(b"100:", &limits).unwrap_err(),
        BencodeError::LimitExceeded(_)
    ));
}

#[test]
fn test_string_length_limit_unbounded() {
    // With the length cap lifted, a declared length near usize::MAX must
    // still fail cleanly as truncated input.
    let limits = Limits {
        max_string_len: usize::MAX,
        ..Limits::default()
    };
    assert!(matches!(
        decode_with(b"18446744073709551615:x", &limits).unwrap_err(),
        BencodeError::Invalid(_)
    ));
}

#[test]
fn test_decode_integer_helper_introducer() {
    let mut pos = 0;
    assert!(matches!(
        decode_integer(b"42e", &mut pos).unwrap_err(),
        BencodeError::ExpectedIntroducer
    ));
}

#[test]
fn test_decode_string_helper() {
    let mut pos = 0;
    assert_eq!(
        decode_string(b"4:spam", &mut pos).unwrap(),
        Bytes::from_static(b"spam")
    );
    assert_eq!(pos, 6);

    let mut pos = 0;
    assert!(matches!(
        decode_string(b"spam", &mut pos).unwrap_err(),
        BencodeError::ExpectedDigit
    ));
}

#[test]
fn test_encode_integer() {
    let mut tree = Tree::new();
    let id = tree.integer(0);
    tree.set_root(id);
    assert_eq!(encode(&tree).unwrap(), b"i0e");

    let mut tree = Tree::new();
    let id = tree.integer(-1);
    tree.set_root(id);
    assert_eq!(encode(&tree).unwrap(), b"i-1e");
}

#[test]
fn test_encode_bytes() {
    let mut tree = Tree::new();
    let id = tree.string("spam");
    tree.set_root(id);
    assert_eq!(encode(&tree).unwrap(), b"4:spam");

    let mut tree = Tree::new();
    let id = tree.bytes(Bytes::new());
    tree.set_root(id);
    assert_eq!(encode(&tree).unwrap(), b"0:");
}

#[test]
fn test_encode_list() {
    let mut tree = Tree::new();
    let spam = tree.string("spam");
    let num = tree.integer(42);
    let list = tree.list(vec![spam, num]);
    tree.set_root(list);
    assert_eq!(encode(&tree).unwrap(), b"l4:spami42ee");
}

#[test]
fn test_encode_dict_sorted_keys() {
    let mut tree = Tree::new();
    let one = tree.integer(1);
    let two = tree.integer(2);
    let three = tree.integer(3);

    // Inserted out of order; the dict storage sorts by key bytes.
    let mut entries = BTreeMap::new();
    entries.insert(Bytes::from_static(b"b"), two);
    entries.insert(Bytes::from_static(b"c"), three);
    entries.insert(Bytes::from_static(b"a"), one);
    let dict = tree.dict(entries);
    tree.set_root(dict);

    assert_eq!(encode(&tree).unwrap(), b"d1:ai1e1:bi2e1:ci3ee");
}

#[test]
fn test_encode_node_written_len() {
    let tree = decode(b"d4:infod4:name4:testee").unwrap();
    let mut buf = Vec::new();
    let written = encode_node(&tree, root_of(&tree), &mut buf).unwrap();
    assert_eq!(written, buf.len());
    assert_eq!(buf, b"d4:infod4:name4:testee");
}

#[test]
fn test_roundtrip() {
    // Keys already sorted, so the encoding is byte-identical.
    let original: &[u8] =
        b"d8:announce15:http://test.com4:infod4:name4:test12:piece lengthi16384eee";
    let tree = decode(original).unwrap();
    assert_eq!(encode(&tree).unwrap(), original);
}

#[test]
fn test_roundtrip_structural_equality() {
    let mut tree = Tree::new();
    let name = tree.string("example");
    let length = tree.integer(1024);
    let tag_a = tree.string("a");
    let tag_b = tree.string("b");
    let tags = tree.list(vec![tag_a, tag_b]);
    let mut entries = BTreeMap::new();
    entries.insert(Bytes::from_static(b"name"), name);
    entries.insert(Bytes::from_static(b"length"), length);
    entries.insert(Bytes::from_static(b"tags"), tags);
    let dict = tree.dict(entries);
    tree.set_root(dict);

    let bytes = encode(&tree).unwrap();
    let decoded = decode(&bytes).unwrap();
    assert!(tree.node_eq(dict, &decoded, root_of(&decoded)));
}

#[test]
fn test_encode_idempotent() {
    let tree = decode(b"d4:listl4:spami42eee").unwrap();
    let first = encode(&tree).unwrap();
    let again = encode(&decode(&first).unwrap()).unwrap();
    assert_eq!(first, again);
}

#[test]
fn test_value_accessors_reject_other_variants() {
    let tree = decode(b"i42e").unwrap();
    let root = root_of(&tree);
    assert_eq!(tree.as_integer(root).unwrap(), 42);
    assert!(matches!(
        tree.as_bytes(root).unwrap_err(),
        BencodeError::WrongType { expected: "byte string", found: "integer" }
    ));
    assert!(matches!(
        tree.as_list(root).unwrap_err(),
        BencodeError::WrongType { .. }
    ));
    assert!(matches!(
        tree.as_dict(root).unwrap_err(),
        BencodeError::WrongType { .. }
    ));
}

#[test]
fn test_int_view() {
    let mut tree = decode(b"i42e").unwrap();
    let root = root_of(&tree);

    let mut view = IntView::bind(&mut tree, root).unwrap();
    assert_eq!(view.get(), 42);
    view.set(-7);
    assert_eq!(view.get(), -7);
    assert_eq!(view.to_bytes().unwrap(), b"i-7e");
}

#[test]
fn test_view_bind_wrong_type() {
    let mut tree = decode(b"4:spam").unwrap();
    let root = root_of(&tree);
    assert!(matches!(
        IntView::bind(&mut tree, root).unwrap_err(),
        BencodeError::WrongType { .. }
    ));
}

#[test]
fn test_view_replace() {
    let mut tree = decode(b"i1e").unwrap();
    let root = root_of(&tree);

    let mut view = IntView::bind(&mut tree, root).unwrap();
    view.replace(b"i7e").unwrap();
    assert_eq!(view.get(), 7);
}

#[test]
fn test_view_replace_failure_keeps_binding() {
    let mut tree = decode(b"i1e").unwrap();
    let root = root_of(&tree);
    let len_before = tree.len();

    let mut view = IntView::bind(&mut tree, root).unwrap();

    // Wrong variant: the decode succeeds but the rebind is refused.
    assert!(matches!(
        view.replace(b"4:spam").unwrap_err(),
        BencodeError::WrongType { .. }
    ));
    assert_eq!(view.get(), 1);

    // Malformed input: decode itself fails.
    assert!(view.replace(b"i-0e").is_err());
    assert_eq!(view.get(), 1);

    drop(view);
    // Failed replaces left no nodes behind.
    assert_eq!(tree.len(), len_before);
}

#[test]
fn test_str_view() {
    let mut tree = decode(b"4:spam").unwrap();
    let root = root_of(&tree);

    let mut view = StrView::bind(&mut tree, root).unwrap();
    assert_eq!(view.get_str().unwrap(), "spam");
    view.set(Bytes::from_static(b"eggs"));
    assert_eq!(view.to_bytes().unwrap(), b"4:eggs");
}

#[test]
fn test_list_view() {
    let mut tree = decode(b"li1ee").unwrap();
    let root = root_of(&tree);
    let extra = tree.integer(2);

    let mut view = ListView::bind(&mut tree, root).unwrap();
    assert_eq!(view.len(), 1);
    view.push(extra).unwrap();
    assert_eq!(view.len(), 2);
    let second = view.at(1).unwrap();
    assert_eq!(view.to_bytes().unwrap(), b"li1ei2ee");
    drop(view);

    assert_eq!(tree.as_integer(second).unwrap(), 2);
}

#[test]
fn test_dict_view() {
    let mut tree = decode(b"de").unwrap();
    let root = root_of(&tree);
    let value = tree.integer(1);

    let mut view = DictView::bind(&mut tree, root).unwrap();
    assert!(view.is_empty());
    view.insert(Bytes::from_static(b"foo"), value).unwrap();
    assert!(view.contains(b"foo"));
    assert_eq!(view.get(b"bar"), None);
    assert_eq!(view.to_bytes().unwrap(), b"d3:fooi1ee");
}

#[test]
fn test_dict_view_insert_rejects_cycle() {
    let mut tree = decode(b"de").unwrap();
    let root = root_of(&tree);

    let mut view = DictView::bind(&mut tree, root).unwrap();
    assert!(matches!(
        view.insert(Bytes::from_static(b"self"), root).unwrap_err(),
        BencodeError::Invalid(_)
    ));
    assert!(view.is_empty());
    drop(view);

    // The rejected insertion left the tree walkable.
    assert_eq!(encode(&tree).unwrap(), b"de");
}

#[test]
fn test_list_view_push_rejects_cycle() {
    let mut tree = decode(b"llee").unwrap();
    let outer = root_of(&tree);
    let inner = tree.as_list(outer).unwrap()[0];

    // Pushing the outer list into the inner one would close a loop
    // through two nodes.
    let mut view = ListView::bind(&mut tree, inner).unwrap();
    assert!(matches!(
        view.push(outer).unwrap_err(),
        BencodeError::Invalid(_)
    ));
    assert!(view.is_empty());
}

#[test]
fn test_dict_view_insert_allows_shared_node() {
    let mut tree = decode(b"de").unwrap();
    let root = root_of(&tree);
    let value = tree.integer(1);

    // The same node under two keys is aliasing, not a cycle.
    let mut view = DictView::bind(&mut tree, root).unwrap();
    view.insert(Bytes::from_static(b"a"), value).unwrap();
    view.insert(Bytes::from_static(b"b"), value).unwrap();
    assert_eq!(view.to_bytes().unwrap(), b"d1:ai1e1:bi1ee");
}

#[test]
fn test_mapping_primitives() {
    assert_eq!(to_bytes(&42i64).unwrap(), b"i42e");
    assert_eq!(from_bytes::<i64>(b"i42e").unwrap(), 42);

    assert_eq!(to_bytes(&"spam").unwrap(), b"4:spam");
    assert_eq!(from_bytes::<String>(b"4:spam").unwrap(), "spam");

    assert_eq!(to_bytes(&7u32).unwrap(), b"i7e");
    assert!(matches!(
        from_bytes::<u32>(b"i-1e").unwrap_err(),
        BencodeError::Invalid(_)
    ));
}

#[test]
fn test_mapping_sequence() {
    let values = vec![1i64, 2];
    assert_eq!(to_bytes(&values).unwrap(), b"li1ei2ee");
    assert_eq!(from_bytes::<Vec<i64>>(b"li1ei2ee").unwrap(), values);
}

#[test]
fn test_mapping_string_keyed_map() {
    let mut map = BTreeMap::new();
    map.insert("foo".to_string(), 1i64);
    map.insert("bar".to_string(), 2i64);

    let bytes = to_bytes(&map).unwrap();
    assert_eq!(bytes, b"d3:bari2e3:fooi1ee");
    assert_eq!(from_bytes::<BTreeMap<String, i64>>(&bytes).unwrap(), map);
}

#[test]
fn test_aggregate_roundtrip() {
    let student = Student {
        name: "alice".to_string(),
        sid: 3232323,
    };
    let bytes = to_bytes(&student).unwrap();
    assert_eq!(bytes, b"d4:name5:alice3:sidi3232323ee");
    assert_eq!(from_bytes::<Student>(&bytes).unwrap(), student);
}

#[test]
fn test_nested_aggregate_roundtrip() {
    let roster = Roster {
        label: "cs101".to_string(),
        students: vec![
            Student {
                name: "alice".to_string(),
                sid: 1,
            },
            Student {
                name: "bob".to_string(),
                sid: 2,
            },
        ],
    };

    let bytes = to_bytes(&roster).unwrap();
    assert_eq!(from_bytes::<Roster>(&bytes).unwrap(), roster);
}

#[test]
fn test_aggregate_in_map_roundtrip() {
    let mut spans = BTreeMap::new();
    spans.insert("head".to_string(), Span { start: 0, end: 10 });
    spans.insert("tail".to_string(), Span { start: 90, end: 100 });

    let bytes = to_bytes(&spans).unwrap();
    assert_eq!(
        from_bytes::<BTreeMap<String, Span>>(&bytes).unwrap(),
        spans
    );
}

#[test]
fn test_aggregate_missing_key() {
    assert!(matches!(
        from_bytes::<Student>(b"d4:name5:alicee").unwrap_err(),
        BencodeError::KeyNotFound(key) if key == "sid"
    ));
}

#[test]
fn test_aggregate_wrong_field_type() {
    assert!(matches!(
        from_bytes::<Student>(b"d4:name5:alice3:sid3:abce").unwrap_err(),
        BencodeError::WrongType { expected: "integer", .. }
    ));
}

#[test]
fn test_facade_select_assign_retrieve() {
    let mut b = Bencode::new();
    b.select("name").assign(&"alice").unwrap();
    b.select("sid").assign(&42i64).unwrap();

    assert_eq!(b.to_bytes().unwrap(), b"d4:name5:alice3:sidi42ee");
    assert_eq!(b.retrieve::<String>("name").unwrap(), "alice");
    assert_eq!(b.retrieve::<i64>("sid").unwrap(), 42);

    assert!(matches!(
        b.retrieve::<i64>("missing").unwrap_err(),
        BencodeError::KeyNotFound(key) if key == "missing"
    ));
}

#[test]
fn test_facade_assign_aggregate() {
    let mut b = Bencode::new();
    let student = Student {
        name: "alice".to_string(),
        sid: 7,
    };
    b.select("student").assign(&student).unwrap();

    assert_eq!(
        b.to_bytes().unwrap(),
        b"d7:studentd4:name5:alice3:sidi7eee"
    );
    assert_eq!(b.retrieve::<Student>("student").unwrap(), student);
}

#[test]
fn test_facade_from_bytes_requires_dict() {
    assert!(matches!(
        Bencode::from_bytes(b"i1e").unwrap_err(),
        BencodeError::WrongType { expected: "dict", .. }
    ));
}

#[test]
fn test_facade_append_and_at() {
    let mut b = Bencode::new();
    b.append(&1i64)
        .unwrap()
        .append(&2i64)
        .unwrap()
        .append(&"spam")
        .unwrap();

    assert_eq!(b.at::<i64>(0).unwrap().value().unwrap(), 1);
    assert_eq!(b.at::<String>(2).unwrap().value().unwrap(), "spam");

    // The reserved list lives under the "LIST" key of the root dict.
    assert_eq!(b.to_bytes().unwrap(), b"d4:LISTli1ei2e4:spamee");

    assert!(matches!(
        b.at::<i64>(9).unwrap_err(),
        BencodeError::Invalid(_)
    ));
}

#[test]
fn test_facade_at_without_append() {
    let b = Bencode::new();
    assert!(matches!(
        b.at::<i64>(0).unwrap_err(),
        BencodeError::KeyNotFound(key) if key == "LIST"
    ));
}

#[test]
fn test_facade_at_defers_conversion() {
    let mut b = Bencode::new();
    b.append(&"spam").unwrap();

    // Resolving the element succeeds; the type mismatch only surfaces when
    // the deferred conversion runs.
    let lazy = b.at::<i64>(0).unwrap();
    assert!(matches!(
        lazy.value().unwrap_err(),
        BencodeError::WrongType { expected: "integer", .. }
    ));
}

#[test]
fn test_pretty_output() {
    let tree = decode(b"d3:fooi1ee").unwrap();
    let rendered = tree.pretty(root_of(&tree)).to_string();
    assert_eq!(rendered, "{\n  \"foo\": 1\n}");

    let tree = decode(b"l1:ai2ee").unwrap();
    assert_eq!(tree.pretty(root_of(&tree)).to_string(), "[\"a\", 2]");
}
