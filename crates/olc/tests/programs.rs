//! Whole-program tests against the bundled prelude

use olang_compiler::frontend::ast::SyntaxComponent;
use olang_compiler::frontend::{OFrontend, Prelude};
use olang_compiler::{CompileError, CompiledUnit};
use pretty_assertions::assert_eq;

fn compile(source: &str) -> Result<CompiledUnit, CompileError> {
    OFrontend::compile_unit(source, &Prelude::Standard)
}

const COUNTER: &str = "
class Counter is
    var count: 0

    this() is
    end

    this(start: Integer) is
        count := start
    end

    method increment(): Integer is
        count := count.Plus(1)
        return count
    end

    method reset() is
        count := 0
        return
    end
end

class Main is
    this() is
        var c: Counter(10)
        var total: 0.0
        while c.increment().Less(20) loop
            total := total.Plus(c.increment().toReal())
        end
        if total.Greater(100.0) then
            c.reset()
        else
            c := Counter()
        end
    end
end
";

#[test]
fn test_call_as_statement_is_rejected() {
    // Expression statements are not part of the grammar
    let err = compile(COUNTER).unwrap_err();
    assert!(err.is_syntax());
    assert_eq!(err.message(), "Expected ':=' but got \".\"");
}

#[test]
fn test_counter_program() {
    let source = COUNTER.replace("c.reset()", "var done: c.increment()");
    let unit = compile(&source).unwrap();

    let classes: Vec<String> = unit
        .program
        .children()
        .iter()
        .map(|class| class.children()[1].class_name_text())
        .collect();
    assert_eq!(classes, vec!["Counter", "Main"]);

    let counter = unit.symbols.class_id("Counter").unwrap();
    let class = unit.symbols.class(counter);
    assert_eq!(class.fields["count"].ty, "Integer");
    assert_eq!(class.constructors.len(), 2);
    assert_eq!(class.methods["increment"][0].return_type.as_deref(), Some("Integer"));
    assert_eq!(class.methods["reset"][0].return_type, None);

    let main = unit.symbols.class_id("Main").unwrap();
    let scope = &unit.symbols.class(main).constructors[0].scope;
    assert_eq!(scope.lookup("c").map(|v| v.ty.as_str()), Some("Counter"));
    assert_eq!(scope.lookup("total").map(|v| v.ty.as_str()), Some("Real"));
}

#[test]
fn test_inheritance_program() {
    let source = "
class Shape is
    var sides: 0
    method area(): Real is
        return 0.0
    end
    method describe(): Integer is
        return sides
    end
end

class Square extends Shape is
    var length: 1.0
    this(l: Real) is
        length := l
        sides := 4
    end
    method area(): Real is
        return length.Mult(length)
    end
end

class Program is
    method run(): Real is
        var shape: Square(2.0)
        var n: shape.describe()
        if n.Equal(4).And(true) then
            return shape.area()
        end
        return 0.0
    end
end
";
    let unit = compile(source).unwrap();
    let square = unit.symbols.class_id("Square").unwrap();
    let shape = unit.symbols.class_id("Shape").unwrap();
    assert_eq!(unit.symbols.class(square).parent, Some(shape));
    assert_eq!(
        unit.symbols.field_lookup(square, "sides").map(|f| f.ty.as_str()),
        Some("Integer")
    );
}

#[test]
fn test_generic_array_types() {
    let source = "
class Matrix is
    method row(cells: Array[Real], index: Integer): Array[Real] is
        return cells
    end
    method make(): Array[Integer] is
        return Array[Integer]()
    end
end
";
    // `Array[Real]` as a return type is not a single token
    let err = compile(source).unwrap_err();
    assert!(err.is_syntax());

    let params_only = "
class Matrix is
    method row(cells: Array[Real], index: Integer) is
        var copy: cells
        var fresh: Array[Integer]()
    end
end
";
    let unit = compile(params_only).unwrap();
    let matrix = unit.symbols.class_id("Matrix").unwrap();
    let scope = &unit.symbols.class(matrix).methods["row"][0].scope;
    assert_eq!(scope.lookup("copy").map(|v| v.ty.as_str()), Some("Array[Real]"));
    assert_eq!(scope.lookup("fresh").map(|v| v.ty.as_str()), Some("Array[Integer]"));
}

#[test]
fn test_errors_carry_positions() {
    let source = "class A is\n    method m() is\n        if 1 then\n        end\n    end\nend\n";
    let err = compile(source).unwrap_err();
    assert!(err.is_semantic());
    assert_eq!(
        err.to_string(),
        concat!(
            "Semantic error: Condition of if statement must be Boolean, got Integer. ",
            "Line: 3, Column: 12"
        )
    );
}

#[test]
fn test_lexical_error_surfaces() {
    let err = compile("class A is\n  var x: 1 % 2\nend").unwrap_err();
    assert!(matches!(err, CompileError::Lexer { .. }));
    assert_eq!(err.to_string(), "Lexical error: Unexpected symbol: '%'. Line: 2, Column: 12");
}

#[test]
fn test_program_tree_is_unchanged_by_analysis() {
    let source = "class A is var x: 1 end";
    let unit = compile(source).unwrap();
    let parsed = olang_compiler::frontend::Parser::new(source)
        .parse_program()
        .unwrap();
    assert_eq!(unit.program, parsed);
    assert!(unit.program.is(SyntaxComponent::Program));
}
