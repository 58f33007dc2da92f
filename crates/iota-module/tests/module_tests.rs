use pretty_assertions::assert_eq;

use iota_module::Module;

fn module() -> Module {
    Module::new(None, "test")
}

#[test]
fn aliases_become_defs_and_expressions_evaluate() {
    let mut module = module();
    module.add_text("main.iota", "x = 1 + 2\nx * 2\n");
    module.run_eval_queue();
    assert_eq!(module.errors.len(), 0, "errors: {:?}", module.errors);
    assert_eq!(module.top_level_evaluations.len(), 1);
    assert_eq!(module.top_level_evaluations[0].message, "6");
    assert!(module.get_def("test:x").is_some());
}

#[test]
fn output_lists_top_level_evaluations() {
    let mut module = module();
    module.add_text("main.iota", "x = 1 + 2\nx * 2\n");
    let (text, has_errors) = module.render_output(false);
    assert!(!has_errors);
    assert_eq!(text, "top level evaluations:\nmain.iota:2 -> 6\n");
}

#[test]
fn unbound_identifiers_are_collected_not_thrown() {
    let mut module = module();
    module.add_text("main.iota", "nope + 1\n");
    assert_eq!(module.errors.len(), 1);
    let (text, has_errors) = module.render_output(false);
    assert!(has_errors);
    assert!(
        text.contains("alias 'nope' does not exist"),
        "got: {text}"
    );
    assert!(text.contains("main.iota:1"), "got: {text}");
}

#[test]
fn parse_errors_are_collected() {
    let mut module = module();
    module.add_text("main.iota", "(1 + 2\n");
    assert_eq!(module.errors.len(), 1);
    assert!(module.errors[0].message.contains("')'"));
}

#[test]
fn cd_scopes_definitions_by_directory() {
    let mut module = module();
    module.add_text("util.iota", ">cd ~util\nhelper = 5\nhelper + 1\n");
    assert_eq!(module.errors.len(), 0, "errors: {:?}", module.errors);
    assert_eq!(module.top_level_evaluations[0].message, "6");
    assert!(module.get_def("test:util/helper").is_some());

    // back at the root the util directory is no longer visible
    module.add_text("main.iota", ">cd ~\nhelper\n");
    assert_eq!(module.errors.len(), 1);
    assert!(module.errors[0].message.contains("'helper' does not exist"));
}

#[test]
fn nested_directories_see_their_ancestors() {
    let mut module = module();
    module.add_text(
        "main.iota",
        "base = 2\n>cd ~a/b\ninner = base + 1\ninner\n",
    );
    assert_eq!(module.errors.len(), 0, "errors: {:?}", module.errors);
    assert_eq!(module.top_level_evaluations[0].message, "3");
}

#[test]
fn importing_builtin_is_recorded() {
    let mut module = module();
    module.add_text("main.iota", ">module_import builtin\n");
    assert_eq!(module.errors.len(), 0, "errors: {:?}", module.errors);
    assert_eq!(module.imports().len(), 1);
    assert_eq!(module.imports()[0].name, "builtin");
    assert_eq!(module.imports()[0].root_path, "");
}

#[test]
fn importing_anything_else_is_an_error() {
    let mut module = module();
    module.add_text("main.iota", ">module_import other\n");
    assert_eq!(module.errors.len(), 1);
    assert!(module.errors[0].message.contains("'other'"));
}

#[test]
fn unknown_commands_are_errors() {
    let mut module = module();
    module.add_text("main.iota", ">frobnicate\n");
    assert_eq!(module.errors.len(), 1);
    assert!(module.errors[0].message.contains("'frobnicate'"));
}

#[test]
fn printed_defs_carry_dependency_comments() {
    let mut module = module();
    module.add_text("main.iota", "x = 3\n");
    module.run_eval_queue();
    assert_eq!(module.print_defs(false), "// []\nx = 3");
}

#[test]
fn later_statements_shadow_earlier_defs() {
    let mut module = module();
    module.add_text("main.iota", "x = 1\nx = 2\nx\n");
    module.run_eval_queue();
    assert_eq!(module.errors.len(), 0, "errors: {:?}", module.errors);
    assert_eq!(module.top_level_evaluations[0].message, "2");
}

#[test]
fn saved_modules_can_be_read_back() {
    let base = std::env::temp_dir().join(format!("iota-module-test-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&base);

    let mut module = Module::new(Some(base.clone()), "demo");
    module.add_text("main.iota", ">module_import builtin\nx = 3\n");
    module.run_eval_queue();
    assert_eq!(module.errors.len(), 0, "errors: {:?}", module.errors);
    module.save_to_filesystem().expect("save failed");

    let defs_text = std::fs::read_to_string(module.defs_path().unwrap()).unwrap();
    assert!(defs_text.contains("x = 3"), "got: {defs_text}");

    let mut restored = Module::new(Some(base.clone()), "demo");
    restored.read_from_filesystem().expect("read failed");
    assert_eq!(restored.imports().len(), 1);
    assert!(restored.get_def("demo:x").is_some());

    let _ = std::fs::remove_dir_all(&base);
}
