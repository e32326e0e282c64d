#[test]
fn compile_tests() {
    let t = trybuild::TestCases::new();

    /* api_body */

    t.pass("tests/api_body_compile_tests/01_struct.rs");
    t.pass("tests/api_body_compile_tests/03_enum.rs");

    t.compile_fail("tests/api_body_compile_tests/04_serialize_struct_only.rs");
    t.compile_fail("tests/api_body_compile_tests/05_deserialize_struct_only.rs");
    t.pass("tests/api_body_compile_tests/06_se_de_struct.rs");

    t.compile_fail("tests/api_body_compile_tests/07_serialize_enum_only.rs");
    t.compile_fail("tests/api_body_compile_tests/08_deserialize_enum_only.rs");
    t.pass("tests/api_body_compile_tests/09_se_de_enum.rs");

    /* api_error */

    t.pass("tests/api_error_compile_tests/03_basic_external.rs");
    t.pass("tests/api_error_compile_tests/05_msg_and_code.rs");
    t.pass("tests/api_error_compile_tests/09_enum_toplevel_attrs.rs");
    t.pass("tests/api_error_compile_tests/10_enum_fields.rs");
}
