//! End-to-end tests for the program side of the pipeline: entity commands
//! in documentation blocks through to the finished model.

use doclang::model::{Declaration, DocumentNode, EntityKind};
use doclang_testing::*;

#[test]
fn class_with_brief_only() {
    let model = run_source_test(&block(r"\class vector \brief text \endclass"));
    let vector = find_entity(&model, "vector");
    assert!(matches!(vector.kind, EntityKind::Class { .. }));
    assert_eq!(vector.brief.as_deref(), Some("text"));
    assert!(vector.description.is_none());
    assert_eq!(model.entity_count(), 1);
}

#[test]
fn prose_between_brief_and_endclass_is_one_paragraph() {
    let model = run_source_test(&block(
        "\\class vector \\brief A dynamic array.\nDetailed text here.\n\\endclass",
    ));
    let vector = find_entity(&model, "vector");
    assert_eq!(vector.brief.as_deref(), Some("A dynamic array."));
    assert_eq!(description_texts(&model, "vector"), vec!["Detailed text here."]);
}

#[test]
fn function_declaration_round_trip() {
    let model = run_source_test(&block(
        "\\fn char* getenv(const char* env_var);\n\
         \\param env_var Name of the variable to read.\n\
         \\returns The value, or null.\n\
         \\endfn",
    ));
    let getenv = find_entity(&model, "getenv");
    let function = match &getenv.kind {
        EntityKind::Function(function) => function,
        other => panic!("expected a function, got {other:?}"),
    };
    let signature = match &function.declaration {
        Declaration::Parsed(signature) => signature,
        Declaration::Raw(text) => panic!("declaration did not parse: {text}"),
    };
    assert_eq!(
        signature.return_type.as_ref().unwrap().to_string(),
        "char*"
    );
    assert_eq!(signature.parameters.len(), 1);
    assert_eq!(signature.parameters[0].name.as_deref(), Some("env_var"));
    assert_eq!(signature.parameters[0].ty.to_string(), "const char*");
    assert_eq!(function.returns.as_deref(), Some("The value, or null."));
    assert_eq!(function.parameters.len(), 1);
    let parameter = model.arena.get(function.parameters[0]);
    assert_eq!(parameter.name, "env_var");
    assert_eq!(
        parameter.brief.as_deref(),
        Some("Name of the variable to read.")
    );
}

#[test]
fn nested_generics_survive_the_pipeline() {
    let model = run_source_test(&block(
        "\\fn std::vector<std::vector<int>> rows();\n\\endfn",
    ));
    let rows = find_entity(&model, "rows");
    match &rows.kind {
        EntityKind::Function(function) => match &function.declaration {
            Declaration::Parsed(signature) => {
                assert_eq!(
                    signature.return_type.as_ref().unwrap().to_string(),
                    "std::vector<std::vector<int>>"
                );
            }
            Declaration::Raw(text) => panic!("declaration did not parse: {text}"),
        },
        other => panic!("expected a function, got {other:?}"),
    }
}

#[test]
fn unparsable_declaration_keeps_raw_text_and_the_block() {
    let model = run_source_test(&block(
        "\\fn int operator weird stuff here(;(\n\\brief Still documented.\n\\endfn",
    ));
    // The entity exists, with the raw declaration and its brief.
    let (_, entity) = model
        .arena
        .iter()
        .find(|(_, e)| matches!(e.kind, EntityKind::Function(_)))
        .expect("the function entity exists");
    assert_eq!(entity.brief.as_deref(), Some("Still documented."));
    match &entity.kind {
        EntityKind::Function(function) => {
            assert!(matches!(function.declaration, Declaration::Raw(_)));
        }
        _ => unreachable!(),
    }
}

#[test]
fn namespace_nesting_and_get_or_create() {
    let model = run_source_test(&format!(
        "{}{}",
        block("\\namespace std\n\\class vector \\brief One.\n\\endclass\n\\endnamespace"),
        block("\\namespace std\n\\class vector\nMore text.\n\\endclass\n\\endnamespace"),
    ));
    // The second block reuses both the namespace and the class.
    assert_eq!(model.entity_count(), 2);
    let vector = find_entity(&model, "vector");
    assert_eq!(vector.brief.as_deref(), Some("One."));
    assert_eq!(description_texts(&model, "vector"), vec!["More text."]);
    assert_eq!(child_names(&model, "std"), vec!["vector"]);
}

#[test]
fn variable_typedef_and_macro() {
    let model = run_source_test(&format!(
        "{}{}{}",
        block("\\variable static const int max_size = 64;\n\\brief Capacity limit.\n\\endvariable"),
        block("\\typedef unsigned int size_type;\n\\endtypedef"),
        block("\\macro MIN(a, b)\n\\brief The smaller of two values.\n\\endmacro"),
    ));
    let max_size = find_entity(&model, "max_size");
    assert!(matches!(max_size.kind, EntityKind::Variable { .. }));
    assert_eq!(max_size.brief.as_deref(), Some("Capacity limit."));
    let size_type = find_entity(&model, "size_type");
    match &size_type.kind {
        EntityKind::Typedef { declaration } => match declaration {
            Declaration::Parsed(typedef) => assert_eq!(typedef.ty.to_string(), "unsigned int"),
            Declaration::Raw(text) => panic!("typedef did not parse: {text}"),
        },
        other => panic!("expected a typedef, got {other:?}"),
    }
    // Top-level macros live on the program, not under the root namespace.
    let program = model.program.as_ref().unwrap();
    assert_eq!(program.macros.len(), 1);
    let min = model.arena.get(program.macros[0]);
    assert_eq!(min.name, "MIN");
    assert_eq!(min.brief.as_deref(), Some("The smaller of two values."));
    let root_children: Vec<&str> = model
        .arena
        .get(program.root)
        .children()
        .iter()
        .map(|&id| model.arena.get(id).name.as_str())
        .collect();
    assert_eq!(root_children, vec!["max_size", "size_type"]);
}

#[test]
fn enum_with_explicit_values() {
    let model = run_source_test(&block(
        "\\enum Color\n\\value Red The warm one.\n\\value Green\n\\endenum",
    ));
    assert_eq!(child_names(&model, "Color"), vec!["Red", "Green"]);
    assert!(find_entity(&model, "Red").description.is_some());
}

#[test]
fn enum_split_across_blocks_recovers_enumerators() {
    let source = "\
/*!
 * \\enum Corner
 * \\value NorthWest The north-west corner.
 */
enum Corner { NorthWest, NorthEast, SouthWest, SouthEast };
/*!
 * \\endenum
 */
";
    let model = run_source_test(source);
    assert_eq!(
        child_names(&model, "Corner"),
        vec!["NorthWest", "NorthEast", "SouthWest", "SouthEast"]
    );
    // The documented value kept its documentation; the recovered ones have
    // none.
    assert!(find_entity(&model, "NorthWest").description.is_some());
    assert!(find_entity(&model, "NorthEast").description.is_none());
    assert_eq!(model.entity_count(), 5);
}

#[test]
fn ghost_enum_is_discarded_by_another_opening_command() {
    let source = format!(
        "{}{}",
        block("\\enum Corner\n\\value NorthWest"),
        block("\\class vector \\endclass"),
    );
    let model = run_source_test(&source);
    // The class was not nested inside the never-closed enum.
    let vector = find_entity(&model, "vector");
    let root = model.program.as_ref().unwrap().root;
    assert_eq!(vector.parent, Some(root));
}

#[test]
fn nonmember_reparents_and_records_the_relation() {
    let model = run_source_test(&block(
        "\\class vector\n\
         \\fn void swap(vector& a, vector& b);\n\
         \\nonmember\n\
         \\endfn\n\
         \\endclass",
    ));
    let program = model.program.as_ref().unwrap();
    let swap = find_entity_id(&model, "swap");
    let vector = find_entity_id(&model, "vector");
    assert_eq!(program.related.len(), 1);
    assert_eq!(program.related[0].class, vector);
    assert_eq!(program.related[0].function, swap);
    // The function now lives in the root namespace, not the class.
    assert!(child_names(&model, "vector").is_empty());
    assert_eq!(model.arena.get(swap).parent, Some(program.root));
}

#[test]
fn relates_names_the_class_explicitly() {
    let model = run_source_test(&format!(
        "{}{}",
        block("\\class matrix \\endclass"),
        block("\\fn matrix transpose(const matrix& m);\n\\relates matrix\n\\endfn"),
    ));
    let program = model.program.as_ref().unwrap();
    assert_eq!(program.related.len(), 1);
    assert_eq!(program.related[0].class, find_entity_id(&model, "matrix"));
    assert_eq!(
        program.related[0].function,
        find_entity_id(&model, "transpose")
    );
}

#[test]
fn ingroup_registers_entities_in_order() {
    let model = run_source_test(&format!(
        "{}{}",
        block("\\class vector\n\\ingroup containers, sequences\n\\endclass"),
        block("\\class map\n\\ingroup containers\n\\endclass"),
    ));
    assert_eq!(model.groups.len(), 2);
    assert_eq!(model.groups[0].name, "containers");
    assert_eq!(model.groups[0].members.len(), 2);
    assert_eq!(model.groups[1].name, "sequences");
    assert_eq!(model.groups[1].members.len(), 1);
}

#[test]
fn since_tags_the_entity() {
    let model = run_source_test(&block("\\class vector\n\\since 2.1\n\\endclass"));
    assert_eq!(find_entity(&model, "vector").since.as_deref(), Some("2.1"));
}

#[test]
fn code_block_in_a_description() {
    let model = run_source_test(&block(
        "\\class buffer\n\\code\nint x = buffer.size();\n\\endcode\n\\endclass",
    ));
    let buffer = find_entity(&model, "buffer");
    let nodes = &buffer.description.as_ref().unwrap().nodes;
    assert_eq!(nodes.len(), 1);
    match &nodes[0] {
        DocumentNode::CodeBlock { text } => assert_eq!(text, "int x = buffer.size();"),
        other => panic!("expected a code block, got {other:?}"),
    }
}

#[test]
fn code_block_with_continuation_prefixes() {
    let source = "\
/*!
 * \\class grid
 * \\code
 * for (auto& row : rows) {
 *     row.clear();
 * }
 * \\endcode
 * \\endclass
 */
";
    let model = run_source_test(source);
    let grid = find_entity(&model, "grid");
    let nodes = &grid.description.as_ref().unwrap().nodes;
    match &nodes[0] {
        DocumentNode::CodeBlock { text } => {
            assert_eq!(text, "for (auto& row : rows) {\n    row.clear();\n}");
        }
        other => panic!("expected a code block, got {other:?}"),
    }
}
