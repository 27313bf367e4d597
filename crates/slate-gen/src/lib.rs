//! Assembly code generation (§4.4): walks the flat statement list the
//! parser produced and emits deterministic x86-64 text into an
//! [`AssemblyUnit`]. Instruction selection itself is left open by the
//! specification; what's fixed is the four-section output shape, the
//! `sizeof` table, and the register model, all implemented here.
//!
//! Custom operators and casts (`operation_decl`/`cast_decl`) are inlined at
//! each call site rather than compiled to real, separately-called
//! functions: their body's `return` becomes a jump to the call site's own
//! end label instead of a stack-frame teardown. This sidesteps needing a
//! second calling convention for operator bodies, which the specification
//! does not constrain either way.

pub mod asm;
pub mod error;
pub mod registers;
pub mod sizeof;

pub use asm::AssemblyUnit;
pub use error::{CodeGenError, Result};
pub use registers::{Register, BLOCK_WIDTH};

use std::collections::HashMap;

use slate_par::{
    Cast, DoWhileStmt, ExprId, ExprPayload, ForStmt, IfStmt, Literal, NodeId, NodePayload,
    Operation, Program, TypeId, TypeKind, VarDecl, WhileStmt,
};
use slate_util::diagnostic::Handler;

const ARG_REGS: [Register; 6] =
    [Register::Rdi, Register::Rsi, Register::Rdx, Register::Rcx, Register::R8, Register::R9];

fn mangle(name: &str) -> String {
    name.replace(':', "_")
}

/// Picks the register view matching a value's byte width, following §4.4's
/// `sizeof` table (1/4/8 bytes are what the language's scalar kinds
/// actually produce; 2 is included for completeness of the row model).
fn sized(reg: Register, width: u64) -> Register {
    match width {
        1 => reg.to08(),
        2 => reg.to16(),
        4 => reg.to32(),
        _ => reg.to64(),
    }
}

fn mov_mnemonic(width: u64) -> &'static str {
    if width == 1 {
        "movzx"
    } else {
        "mov"
    }
}

struct Frame {
    locals: HashMap<String, i64>,
    size: i64,
}

impl Frame {
    fn new() -> Self {
        Frame { locals: HashMap::new(), size: 0 }
    }

    fn alloc(&mut self, name: &str, width: u64) -> i64 {
        self.size += width.max(1) as i64;
        let offset = self.size;
        self.locals.insert(name.to_string(), offset);
        offset
    }

    fn offset(&self, name: &str) -> Result<i64> {
        self.locals.get(name).copied().ok_or_else(|| CodeGenError::UndefinedSymbol(name.to_string()))
    }
}

pub struct Generator<'a> {
    program: &'a Program,
    unit: AssemblyUnit,
    handler: Handler,
    label_counter: u32,
    frame: Frame,
}

/// Runs the full driver over a parsed [`Program`], returning the rendered
/// assembly unit and any non-fatal diagnostics (register width warnings).
pub fn generate(program: &Program) -> Result<(AssemblyUnit, Handler)> {
    let mut gen = Generator {
        program,
        unit: AssemblyUnit::new(),
        handler: Handler::new(),
        label_counter: 0,
        frame: Frame::new(),
    };
    gen.run()?;
    Ok((gen.unit, gen.handler))
}

impl<'a> Generator<'a> {
    fn run(&mut self) -> Result<()> {
        let statements = self.program.statements.clone();
        for id in statements {
            self.emit_top_level(id)?;
        }
        Ok(())
    }

    fn fresh_label(&mut self, prefix: &str) -> String {
        self.label_counter += 1;
        format!(".L{prefix}{}", self.label_counter)
    }

    fn sizeof(&self, ty: TypeId) -> Result<u64> {
        sizeof::sizeof(&self.program.arena, &self.program.declared_types, ty)
    }

    fn emit_top_level(&mut self, id: NodeId) -> Result<()> {
        match self.program.arena.nodes[id].payload.clone() {
            NodePayload::FuncDecl(f) => self.emit_func_decl(&f.name, &f.params, f.body.as_deref()),
            NodePayload::VarDecl(v) => self.emit_global_var_decl(&v),
            NodePayload::TypeDecl(_) | NodePayload::OperationDecl(_) | NodePayload::CastDecl(_) => Ok(()),
            other => Err(CodeGenError::Internal(format!("Unexpected node at file scope: {other:?}"))),
        }
    }

    fn emit_func_decl(
        &mut self,
        name: &str,
        params: &[slate_par::Variable],
        body: Option<&[NodeId]>,
    ) -> Result<()> {
        let Some(body) = body else { return Ok(()) };
        if params.len() > ARG_REGS.len() {
            return Err(CodeGenError::Internal(format!(
                "'{name}' takes more than {} parameters",
                ARG_REGS.len()
            )));
        }

        let label = mangle(name);
        self.frame = Frame::new();
        let mut param_sizes = Vec::with_capacity(params.len());
        for p in params {
            param_sizes.push(self.sizeof(p.ty)?);
        }
        let body_size = self.frame_size(body)?;

        self.unit.labels.push_str(&format!("global {label}\n"));
        self.unit.text.push_str(&format!("\n{label}:\n"));
        self.unit.text.push_str("  push rbp\n  mov rbp, rsp\n");
        let total = param_sizes.iter().sum::<u64>() + body_size;
        if total > 0 {
            self.unit.text.push_str(&format!("  sub rsp, {total}\n"));
        }

        for (p, width) in params.iter().zip(&param_sizes) {
            let offset = self.frame.alloc(&p.name, *width);
            let arg_reg = ARG_REGS[self.frame.locals.len() - 1];
            self.unit.text.push_str(&format!("  mov [rbp-{offset}], {}\n", sized(arg_reg, *width).name()));
        }

        self.emit_block(body, None)?;
        self.unit.text.push_str("  mov rsp, rbp\n  pop rbp\n  ret\n");
        Ok(())
    }

    /// Upfront byte count for every local this body (and everything nested
    /// under it) will allocate, so `sub rsp, N` can be emitted before the
    /// body itself assigns offsets. Traverses statements in the same order
    /// `emit_block` will, so the two passes agree.
    fn frame_size(&self, body: &[NodeId]) -> Result<u64> {
        let mut total = 0u64;
        for &id in body {
            total += match self.program.arena.nodes[id].payload.clone() {
                NodePayload::VarDecl(v) => self.sizeof(v.var.ty)?,
                NodePayload::Scope(s) => self.frame_size(&s.body)?,
                NodePayload::IfStmt(s) => {
                    let mut t = self.frame_size(&s.then_body)?;
                    if let Some(e) = &s.else_body {
                        t += self.frame_size(e)?;
                    }
                    t
                }
                NodePayload::WhileStmt(s) => self.frame_size(&s.body)?,
                NodePayload::DoWhileStmt(s) => self.frame_size(&s.body)?,
                NodePayload::ForStmt(s) => {
                    let mut t = self.frame_size(&s.body)?;
                    if let Some(init) = s.init {
                        if let NodePayload::VarDecl(v) = &self.program.arena.nodes[init].payload {
                            t += self.sizeof(v.var.ty)?;
                        }
                    }
                    t
                }
                _ => 0,
            };
        }
        Ok(total)
    }

    fn emit_global_var_decl(&mut self, v: &VarDecl) -> Result<()> {
        let width = self.sizeof(v.var.ty)?;
        let label = mangle(&v.var.name);
        match v.value.map(|id| self.program.arena.exprs[id].payload.clone()) {
            Some(ExprPayload::Literal(lit)) => {
                self.unit.data.push_str(&format!("{label}: {}\n", data_directive(width, &lit)));
            }
            Some(_) => {
                return Err(CodeGenError::Internal(format!(
                    "global variable '{}' must be initialized with a literal",
                    v.var.name
                )))
            }
            None => {
                self.unit.bss.push_str(&format!("{label}: resb {width}\n"));
            }
        }
        Ok(())
    }

    fn emit_block(&mut self, body: &[NodeId], ret: Option<&str>) -> Result<()> {
        for &id in body {
            self.emit_stmt(id, ret)?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, id: NodeId, ret: Option<&str>) -> Result<()> {
        match self.program.arena.nodes[id].payload.clone() {
            NodePayload::Scope(s) => self.emit_block(&s.body, ret),
            NodePayload::VarDecl(v) => self.emit_local_var_decl(&v),
            NodePayload::VarSet(v) => {
                self.emit_lvalue_addr(v.target)?;
                self.unit.text.push_str("  push rax\n");
                self.emit_expr(v.value)?;
                let width = self.sizeof(self.program.arena.exprs[v.target].return_type)?;
                self.unit.text.push_str("  pop rbx\n");
                self.unit.text.push_str(&format!("  mov [rbx], {}\n", sized(Register::Rax, width).name()));
                Ok(())
            }
            NodePayload::ReturnStmt(r) => {
                if let Some(value) = r.value {
                    self.emit_expr(value)?;
                }
                match ret {
                    Some(label) => self.unit.text.push_str(&format!("  jmp {label}\n")),
                    None => self.unit.text.push_str("  mov rsp, rbp\n  pop rbp\n  ret\n"),
                }
                Ok(())
            }
            NodePayload::AsmCode(a) => {
                self.unit.text.push_str(&a.body);
                self.unit.text.push('\n');
                Ok(())
            }
            NodePayload::IfStmt(s) => self.emit_if_stmt(&s, ret),
            NodePayload::WhileStmt(s) => self.emit_while_stmt(&s, ret),
            NodePayload::DoWhileStmt(s) => self.emit_do_while_stmt(&s, ret),
            NodePayload::ForStmt(s) => self.emit_for_stmt(&s, ret),
            NodePayload::TypeDecl(_) | NodePayload::OperationDecl(_) | NodePayload::CastDecl(_) => Ok(()),
            other => Err(CodeGenError::Internal(format!("Unexpected statement node: {other:?}"))),
        }
    }

    fn emit_local_var_decl(&mut self, v: &VarDecl) -> Result<()> {
        let width = self.sizeof(v.var.ty)?;
        let offset = self.frame.alloc(&v.var.name, width);
        if let Some(value) = v.value {
            self.emit_expr(value)?;
            self.unit.text.push_str(&format!("  mov [rbp-{offset}], {}\n", sized(Register::Rax, width).name()));
        }
        Ok(())
    }

    fn emit_if_stmt(&mut self, s: &IfStmt, ret: Option<&str>) -> Result<()> {
        self.emit_expr(s.cond)?;
        self.unit.text.push_str("  test al, al\n");
        let else_label = self.fresh_label("else");
        let end_label = self.fresh_label("endif");
        self.unit.text.push_str(&format!("  jz {else_label}\n"));
        self.emit_block(&s.then_body, ret)?;
        self.unit.text.push_str(&format!("  jmp {end_label}\n"));
        self.unit.text.push_str(&format!("{else_label}:\n"));
        if let Some(else_body) = &s.else_body {
            self.emit_block(else_body, ret)?;
        }
        self.unit.text.push_str(&format!("{end_label}:\n"));
        Ok(())
    }

    fn emit_while_stmt(&mut self, s: &WhileStmt, ret: Option<&str>) -> Result<()> {
        let loop_label = self.fresh_label("while");
        let end_label = self.fresh_label("endwhile");
        self.unit.text.push_str(&format!("{loop_label}:\n"));
        self.emit_expr(s.cond)?;
        self.unit.text.push_str("  test al, al\n");
        self.unit.text.push_str(&format!("  jz {end_label}\n"));
        self.emit_block(&s.body, ret)?;
        self.unit.text.push_str(&format!("  jmp {loop_label}\n"));
        self.unit.text.push_str(&format!("{end_label}:\n"));
        Ok(())
    }

    fn emit_do_while_stmt(&mut self, s: &DoWhileStmt, ret: Option<&str>) -> Result<()> {
        let loop_label = self.fresh_label("dowhile");
        self.unit.text.push_str(&format!("{loop_label}:\n"));
        self.emit_block(&s.body, ret)?;
        self.emit_expr(s.cond)?;
        self.unit.text.push_str("  test al, al\n");
        self.unit.text.push_str(&format!("  jnz {loop_label}\n"));
        Ok(())
    }

    fn emit_for_stmt(&mut self, s: &ForStmt, ret: Option<&str>) -> Result<()> {
        if let Some(init) = s.init {
            self.emit_stmt(init, ret)?;
        }
        let loop_label = self.fresh_label("for");
        let end_label = self.fresh_label("endfor");
        self.unit.text.push_str(&format!("{loop_label}:\n"));
        if let Some(cond) = s.cond {
            self.emit_expr(cond)?;
            self.unit.text.push_str("  test al, al\n");
            self.unit.text.push_str(&format!("  jz {end_label}\n"));
        }
        self.emit_block(&s.body, ret)?;
        if let Some(step) = s.step {
            self.emit_stmt(step, ret)?;
        }
        self.unit.text.push_str(&format!("  jmp {loop_label}\n"));
        self.unit.text.push_str(&format!("{end_label}:\n"));
        Ok(())
    }

    /// Leaves the address of an lvalue expression in `rax`.
    fn emit_lvalue_addr(&mut self, id: ExprId) -> Result<()> {
        match self.program.arena.exprs[id].payload.clone() {
            ExprPayload::Variable(v) => {
                let offset = self.frame.offset(&v.name)?;
                self.unit.text.push_str(&format!("  lea rax, [rbp-{offset}]\n"));
                Ok(())
            }
            ExprPayload::Dereference(inner) => self.emit_expr(inner),
            ExprPayload::DotNotation(d) => {
                self.emit_lvalue_base(d.base)?;
                let base_ty = self.field_owner_type(d.base)?;
                let field_offset = self.field_offset(base_ty, &d.after)?;
                if field_offset > 0 {
                    self.unit.text.push_str(&format!("  add rax, {field_offset}\n"));
                }
                Ok(())
            }
            ExprPayload::Subscript(s) => {
                self.emit_expr(s.base)?;
                self.unit.text.push_str("  push rax\n");
                self.emit_expr(s.index)?;
                let elem_ty = self.program.arena.exprs[id].return_type;
                let elem_width = self.sizeof(elem_ty)?;
                self.unit.text.push_str(&format!("  imul rax, rax, {elem_width}\n"));
                self.unit.text.push_str("  pop rbx\n  add rax, rbx\n");
                Ok(())
            }
            other => Err(CodeGenError::Internal(format!("Not an lvalue: {other:?}"))),
        }
    }

    /// `a.b` takes the address of `a` itself (not its dereferenced value)
    /// when `a` is a pointer-to-struct, so dot-notation's base is resolved
    /// through this rather than plain `emit_expr`/`emit_lvalue_addr`.
    fn emit_lvalue_base(&mut self, base: ExprId) -> Result<()> {
        let base_ty = self.program.arena.exprs[base].return_type;
        if self.program.arena.types[base_ty].kind == TypeKind::Pointer {
            self.emit_expr(base)
        } else {
            self.emit_lvalue_addr(base)
        }
    }

    fn field_owner_type(&self, base: ExprId) -> Result<TypeId> {
        let base_ty = self.program.arena.exprs[base].return_type;
        let t = &self.program.arena.types[base_ty];
        if t.kind == TypeKind::Pointer {
            Ok(t.points_to.expect("pointer type always has a pointee"))
        } else {
            Ok(base_ty)
        }
    }

    fn field_offset(&self, struct_ty: TypeId, field: &str) -> Result<u64> {
        let t = &self.program.arena.types[struct_ty];
        let mut offset = 0u64;
        for f in &t.fields {
            if f.name == field {
                return Ok(offset);
            }
            offset += self.sizeof(f.ty)?;
        }
        Err(CodeGenError::UndefinedSymbol(field.to_string()))
    }

    /// Leaves the expression's value in the `rax` family register view
    /// matching its `sizeof`.
    fn emit_expr(&mut self, id: ExprId) -> Result<()> {
        let expr = self.program.arena.exprs[id].clone();
        let width = self.sizeof(expr.return_type)?;
        match expr.payload {
            ExprPayload::Literal(lit) => self.emit_literal(&lit, width),
            ExprPayload::Variable(v) => {
                let offset = self.frame.offset(&v.name)?;
                self.unit.text.push_str(&format!(
                    "  {} {}, [rbp-{offset}]\n",
                    mov_mnemonic(width),
                    sized(Register::Rax, width).name()
                ));
                Ok(())
            }
            ExprPayload::FuncCall(c) => {
                let callee = match &self.program.arena.nodes[c.callee].payload {
                    NodePayload::FuncDecl(f) => mangle(&f.name),
                    _ => unreachable!("call target is always a FuncDecl"),
                };
                self.emit_call(&c.args)?;
                self.unit.text.push_str(&format!("  call {callee}\n"));
                Ok(())
            }
            ExprPayload::InterfaceCall(c) => {
                self.emit_expr(c.callee)?;
                self.unit.text.push_str("  push rax\n");
                self.emit_call(&c.args)?;
                self.unit.text.push_str("  pop rax\n  call rax\n");
                Ok(())
            }
            ExprPayload::InterfaceRef(node) => {
                let label = match &self.program.arena.nodes[node].payload {
                    NodePayload::FuncDecl(f) => mangle(&f.name),
                    _ => unreachable!("interface ref target is always a FuncDecl"),
                };
                self.unit.text.push_str(&format!("  lea rax, [rel {label}]\n"));
                Ok(())
            }
            ExprPayload::Reference(inner) => self.emit_lvalue_addr(inner),
            ExprPayload::Dereference(inner) => {
                self.emit_expr(inner)?;
                self.unit.text.push_str(&format!(
                    "  {} {}, [rax]\n",
                    mov_mnemonic(width),
                    sized(Register::Rax, width).name()
                ));
                Ok(())
            }
            ExprPayload::Subscript(_) | ExprPayload::DotNotation(_) => {
                self.emit_lvalue_addr(id)?;
                self.unit.text.push_str(&format!(
                    "  {} {}, [rax]\n",
                    mov_mnemonic(width),
                    sized(Register::Rax, width).name()
                ));
                Ok(())
            }
            ExprPayload::Cast(c) => self.emit_cast(&c.cast, c.inner),
            ExprPayload::Custom(c) => self.emit_custom(&c.op, c.a, c.b),
        }
    }

    fn emit_literal(&mut self, lit: &Literal, width: u64) -> Result<()> {
        let reg = sized(Register::Rax, width).name();
        match lit {
            Literal::Int(v) => self.unit.text.push_str(&format!("  mov {reg}, {v}\n")),
            Literal::Long(v) => self.unit.text.push_str(&format!("  mov {reg}, {v}\n")),
            Literal::Float(v) => self.unit.text.push_str(&format!("  mov {reg}, {}\n", v.to_bits())),
            Literal::Double(v) => self.unit.text.push_str(&format!("  mov {reg}, {}\n", v.to_bits())),
            Literal::Char(c) => self.unit.text.push_str(&format!("  mov {reg}, {}\n", *c as u32)),
            Literal::Boolean(b) => self.unit.text.push_str(&format!("  mov {reg}, {}\n", *b as u8)),
            Literal::Str(s) => {
                let label = self.fresh_label("str");
                self.unit.data.push_str(&format!("{label}: db {}, 0\n", bytes_literal(s)));
                self.unit.text.push_str(&format!("  lea {reg}, [rel {label}]\n"));
            }
            Literal::Null => self.unit.text.push_str(&format!("  xor {reg}, {reg}\n")),
        }
        Ok(())
    }

    /// Evaluates `args` left to right into temporaries, then loads them
    /// into the System V integer argument registers, leaving the caller to
    /// emit the actual `call`/indirect `call` instruction — keeps later
    /// arguments from clobbering earlier ones while they're still being
    /// computed.
    fn emit_call(&mut self, args: &[ExprId]) -> Result<()> {
        for &arg in args {
            self.emit_expr(arg)?;
            self.unit.text.push_str("  push rax\n");
        }
        for &arg_reg in ARG_REGS.iter().take(args.len()).rev() {
            self.unit.text.push_str(&format!("  pop {}\n", arg_reg.to64().name()));
        }
        Ok(())
    }

    fn emit_cast(&mut self, cast: &Cast, inner: ExprId) -> Result<()> {
        self.emit_expr(inner)?;
        let width = self.sizeof(cast.from)?;
        let offset = self.frame.alloc(&cast.param_name, width);
        self.unit.text.push_str(&format!("  mov [rbp-{offset}], {}\n", sized(Register::Rax, width).name()));
        let end_label = self.fresh_label("castend");
        self.emit_operator_body(cast.body, &end_label)?;
        self.unit.text.push_str(&format!("{end_label}:\n"));
        Ok(())
    }

    fn emit_custom(&mut self, op: &Operation, a: ExprId, b: Option<ExprId>) -> Result<()> {
        self.emit_expr(a)?;
        let a_width = self.sizeof(op.a)?;
        let a_offset = self.frame.alloc(&op.a_name, a_width);
        self.unit.text.push_str(&format!("  mov [rbp-{a_offset}], {}\n", sized(Register::Rax, a_width).name()));

        if let (Some(b_expr), Some(b_ty), Some(b_name)) = (b, op.b, &op.b_name) {
            self.emit_expr(b_expr)?;
            let b_width = self.sizeof(b_ty)?;
            let b_offset = self.frame.alloc(b_name, b_width);
            self.unit.text.push_str(&format!("  mov [rbp-{b_offset}], {}\n", sized(Register::Rax, b_width).name()));
        }

        let end_label = self.fresh_label("opend");
        self.emit_operator_body(op.body, &end_label)?;
        self.unit.text.push_str(&format!("{end_label}:\n"));
        Ok(())
    }

    /// Runs an operator/cast body inline: its `return` jumps to `end_label`
    /// (leaving the result in `rax`) rather than tearing down a stack
    /// frame, since the body executes in the caller's own frame.
    fn emit_operator_body(&mut self, scope: NodeId, end_label: &str) -> Result<()> {
        let stmts = match &self.program.arena.nodes[scope].payload {
            NodePayload::Scope(s) => s.body.clone(),
            other => return Err(CodeGenError::Internal(format!("Operator body is not a scope: {other:?}"))),
        };
        self.emit_block(&stmts, Some(end_label))
    }
}

fn bytes_literal(s: &str) -> String {
    s.bytes().map(|b| b.to_string()).collect::<Vec<_>>().join(", ")
}

fn data_directive(width: u64, lit: &Literal) -> String {
    let directive = match width {
        1 => "db",
        2 => "dw",
        4 => "dd",
        _ => "dq",
    };
    let value = match lit {
        Literal::Int(v) => v.to_string(),
        Literal::Long(v) => v.to_string(),
        Literal::Float(v) => v.to_bits().to_string(),
        Literal::Double(v) => v.to_bits().to_string(),
        Literal::Char(c) => (*c as u32).to_string(),
        Literal::Boolean(b) => (*b as u8).to_string(),
        Literal::Str(_) | Literal::Null => "0".to_string(),
    };
    format!("{directive} {value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use slate_lex::Lexer;
    use slate_par::{NoImports, Parser};

    fn compile(src: &str) -> AssemblyUnit {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let program = Parser::new(tokens, Box::new(NoImports), ".sl").parse().unwrap();
        generate(&program).unwrap().0
    }

    #[test]
    fn renders_four_section_skeleton() {
        let unit = compile("func main() : void { return; }");
        let out = unit.render();
        assert!(out.starts_with("global main\n"));
        assert!(out.contains("section .bss"));
        assert!(out.contains("section .data"));
        assert!(out.contains("section .text"));
    }

    #[test]
    fn function_gets_a_global_label_and_prologue() {
        let unit = compile("func f() : int { return 1; }");
        assert!(unit.labels.contains("global f\n"));
        assert!(unit.text.contains("f:\n"));
        assert!(unit.text.contains("push rbp"));
    }

    #[test]
    fn if_statement_emits_both_branch_labels() {
        let unit = compile("func f() : int { if (true) { return 1; } else { return 2; } }");
        assert!(unit.text.contains("jz"));
        assert!(unit.text.contains("jmp"));
    }

    #[test]
    fn local_variable_gets_a_stack_slot() {
        let unit = compile("func f() : int { var x : int = 5; return x; }");
        assert!(unit.text.contains("mov [rbp-"));
    }
}
