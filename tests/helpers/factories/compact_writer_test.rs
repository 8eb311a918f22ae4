use crate::engine::core::thrift::{CompactReader, CompactType};
use crate::test_helpers::factory::Factory;

#[test]
fn writer_output_reads_back_field_by_field() {
    let mut w = Factory::compact_writer();
    w.struct_begin();
    w.field_i32(1, -7);
    w.field_bool(2, true);
    w.field_string(20, "far field");
    w.struct_end();

    let bytes = w.into_bytes();
    let mut r = CompactReader::new(&bytes);
    r.read_struct_begin().unwrap();
    assert_eq!(r.read_field_begin().unwrap(), Some((CompactType::I32, 1)));
    assert_eq!(r.read_i32().unwrap(), -7);
    assert_eq!(r.read_field_begin().unwrap(), Some((CompactType::BoolTrue, 2)));
    assert!(r.read_bool().unwrap());
    assert_eq!(r.read_field_begin().unwrap(), Some((CompactType::Binary, 20)));
    assert_eq!(r.read_string().unwrap(), "far field");
    assert_eq!(r.read_field_begin().unwrap(), None);
    r.read_struct_end();
    assert_eq!(r.remaining(), 0);
}

#[test]
fn long_lists_use_varint_size() {
    let mut w = Factory::compact_writer();
    w.list_header(CompactType::I32, 20);
    assert_eq!(w.as_bytes(), &[0xf5, 20]);
}
