//! Integration tests for the fact collector, each built on a minimal
//! hand-lowered function.

use marmot_core::{
    bir::{BasicBlock, BlockId, BlockStore, Function, LoanId, Rvalue, Statement, StatementKind},
    borrowck::{self, facts::dump_relation, Facts, Point, PointPosition},
    context::Context,
    marmot_errors::ErrorBuf,
    place::{self, Place, PlaceDb, PlaceId, PlaceKind},
    regions::{FreeRegions, RegionId},
    session::Config,
    source::Span,
    types::{AdtDef, FieldDef, FnSig, Mutability, Region, Substs, Type, TyId, VariantDef, Variance},
};

fn regions(rs: &[u32]) -> FreeRegions {
    rs.iter().map(|&n| RegionId::from(n)).collect()
}

fn rid(n: u32) -> RegionId {
    RegionId::from(n)
}

fn pid(n: u32) -> PlaceId {
    PlaceId::from(n)
}

fn start(block: u32, stmt: u32) -> Point {
    Point::new(BlockId::from(block), stmt, PointPosition::Start)
}

fn mid(block: u32, stmt: u32) -> Point {
    Point::new(BlockId::from(block), stmt, PointPosition::Mid)
}

fn stmt(kind: StatementKind) -> Statement {
    Statement {
        span: Span::default(),
        kind,
    }
}

/// A variable, temporary, or projection with ordinary lvalue flags.
fn lvalue(kind: PlaceKind, ty: TyId, rs: &[u32], is_copy: bool) -> Place {
    Place {
        kind,
        ty,
        regions: regions(rs),
        is_copy,
        is_lvalue: true,
        is_rvalue: false,
    }
}

/// A database seeded with the invalid place and a unit return place.
fn db_with_return(ctx: &Context) -> PlaceDb {
    let mut db = PlaceDb::new();
    let ret = db.add(lvalue(PlaceKind::Variable, ctx.common.unit, &[], true));
    assert_eq!(ret, place::return_place());
    db
}

fn function(
    ctx: &mut Context,
    db: PlaceDb,
    blocks: Vec<BasicBlock>,
    universals: &[u32],
) -> Function {
    Function {
        def_name: ctx.intern_symb("test_subject"),
        span: Span::default(),
        place_db: db,
        basic_blocks: blocks.into_iter().collect::<BlockStore>(),
        universal_regions: universals.iter().map(|&n| rid(n)).collect(),
        universal_region_bounds: vec![],
        is_closure: false,
    }
}

fn collect(func: &Function, ctx: &Context) -> (Facts, ErrorBuf) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut errs = ErrorBuf::new();
    let facts = borrowck::check_function(func, ctx, &mut errs)
        .expect("collection aborted")
        .expect("function skipped");
    (facts, errs)
}

/// `_2 = _3;` with both places copy `i32` variables.
#[test]
fn single_assignment() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let mut db = db_with_return(&ctx);
    let x = db.add(lvalue(PlaceKind::Variable, ctx.common.i32, &[], true));
    let y = db.add(lvalue(PlaceKind::Variable, ctx.common.i32, &[], true));

    let block = BasicBlock::new(
        vec![stmt(StatementKind::Assign(x, Rvalue::Use(y)))],
        vec![],
    );
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, errs) = collect(&func, &ctx);

    assert!(errs.is_empty());
    // Two CFG points, one edge between them.
    assert_eq!(facts.cfg_edge, vec![(start(0, 0), mid(0, 0))]);
    assert_eq!(facts.path_assigned_at_base, vec![(x, mid(0, 0))]);
    assert_eq!(facts.path_accessed_at_base, vec![(y, mid(0, 0))]);
    assert_eq!(facts.var_defined_at, vec![(x, mid(0, 0))]);
    assert_eq!(facts.var_used_at, vec![(y, mid(0, 0))]);
    assert!(facts.path_moved_at_base.is_empty());
    assert!(facts.loan_issued_at.is_empty());
    assert!(facts.subset_base.is_empty());
    assert_eq!(facts.universal_region, vec![rid(0)]);
}

/// `_3 = &'1 _2;` with `_2: i32`. The loan is issued, the base is read but
/// not moved.
#[test]
fn shared_borrow() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let ref_i32 = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ctx.common.i32));
    let mut db = db_with_return(&ctx);
    let x = db.add(lvalue(PlaceKind::Variable, ctx.common.i32, &[], true));
    let r = db.add(lvalue(PlaceKind::Variable, ref_i32, &[1], true));

    let block = BasicBlock::new(
        vec![stmt(StatementKind::Assign(
            r,
            Rvalue::Borrow(rid(1), LoanId::from(0), x),
        ))],
        vec![],
    );
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, errs) = collect(&func, &ctx);

    assert!(errs.is_empty());
    assert_eq!(facts.loan_issued_at, vec![(rid(1), LoanId::from(0), mid(0, 0))]);
    assert_eq!(facts.var_used_at, vec![(x, mid(0, 0))]);
    assert_eq!(facts.path_accessed_at_base, vec![(x, mid(0, 0))]);
    // `i32` carries no regions, so the borrow adds no subset rows.
    assert!(facts.subset_base.is_empty());
    assert!(facts.path_moved_at_base.is_empty());
}

/// Reborrowing data that itself carries a region wires the borrowed
/// regions into the loan's origin.
#[test]
fn borrow_protocol() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let ref_i32 = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ctx.common.i32));
    let ref_ref_i32 = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ref_i32));

    let mut db = db_with_return(&ctx);
    let inner = db.add(lvalue(PlaceKind::Variable, ref_i32, &[1], true));
    let outer = db.add(lvalue(PlaceKind::Variable, ref_ref_i32, &[2, 1], true));

    let block = BasicBlock::new(
        vec![stmt(StatementKind::Assign(
            outer,
            Rvalue::Borrow(rid(2), LoanId::from(0), inner),
        ))],
        vec![],
    );
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, errs) = collect(&func, &ctx);

    assert!(errs.is_empty());
    // Exactly one loan row for the borrow.
    assert_eq!(facts.loan_issued_at, vec![(rid(2), LoanId::from(0), mid(0, 0))]);
    // Each region of the borrowed place outlives the reference's region.
    assert_eq!(facts.subset_base, vec![(rid(1), rid(2), mid(0, 0))]);
}

/// `_3 = _2;` where `_2` is non-copy: the read is also a move.
#[test]
fn move_of_non_copy() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let mut db = db_with_return(&ctx);
    let x = db.add(lvalue(PlaceKind::Variable, ctx.common.str_, &[], false));
    let y = db.add(lvalue(PlaceKind::Variable, ctx.common.str_, &[], false));

    let block = BasicBlock::new(
        vec![stmt(StatementKind::Assign(y, Rvalue::Use(x)))],
        vec![],
    );
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, errs) = collect(&func, &ctx);

    assert!(errs.is_empty());
    assert_eq!(facts.path_moved_at_base, vec![(x, mid(0, 0))]);
    assert_eq!(facts.path_accessed_at_base, vec![(x, mid(0, 0))]);
    assert_eq!(facts.path_assigned_at_base, vec![(y, mid(0, 0))]);
}

/// `_3 = *_2;` where `_2: &str`: exactly one move-behind-reference report,
/// and the access rows still appear.
#[test]
fn move_behind_reference() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let ref_str = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ctx.common.str_));
    let mut db = db_with_return(&ctx);
    let r = db.add(lvalue(PlaceKind::Variable, ref_str, &[1], true));
    let deref = db.add(lvalue(PlaceKind::Deref { parent: r }, ctx.common.str_, &[], false));
    let out = db.add(lvalue(PlaceKind::Variable, ctx.common.str_, &[], false));

    let block = BasicBlock::new(
        vec![stmt(StatementKind::Assign(out, Rvalue::Use(deref)))],
        vec![],
    );
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, errs) = collect(&func, &ctx);

    assert_eq!(errs.len(), 1);
    assert_eq!(facts.path_moved_at_base, vec![(deref, mid(0, 0))]);
    assert_eq!(facts.path_accessed_at_base, vec![(deref, mid(0, 0))]);
    assert_eq!(facts.path_assigned_at_base, vec![(out, mid(0, 0))]);
    // The deref resolves to its root variable.
    assert_eq!(facts.var_used_at, vec![(r, mid(0, 0))]);
}

/// `*_2 = _3;` where `_2: &i32`: exactly one mutation-through-immutable
/// report.
#[test]
fn mutation_through_immutable_reference() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let ref_i32 = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ctx.common.i32));
    let mut db = db_with_return(&ctx);
    let r = db.add(lvalue(PlaceKind::Variable, ref_i32, &[1], true));
    let deref = db.add(lvalue(PlaceKind::Deref { parent: r }, ctx.common.i32, &[], true));
    let x = db.add(lvalue(PlaceKind::Variable, ctx.common.i32, &[], true));

    let block = BasicBlock::new(
        vec![stmt(StatementKind::Assign(deref, Rvalue::Use(x)))],
        vec![],
    );
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, errs) = collect(&func, &ctx);

    assert_eq!(errs.len(), 1);
    assert_eq!(facts.path_assigned_at_base, vec![(deref, mid(0, 0))]);
    // Writing through the projection uses the variable under it.
    assert!(facts.var_used_at.contains(&(r, mid(0, 0))));
}

/// Writing through `&mut` is fine.
#[test]
fn mutation_through_unique_reference_is_clean() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let ref_mut_i32 = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Mut, ctx.common.i32));
    let mut db = db_with_return(&ctx);
    let r = db.add(lvalue(PlaceKind::Variable, ref_mut_i32, &[1], true));
    let deref = db.add(lvalue(PlaceKind::Deref { parent: r }, ctx.common.i32, &[], true));
    let x = db.add(lvalue(PlaceKind::Variable, ctx.common.i32, &[], true));

    let block = BasicBlock::new(
        vec![stmt(StatementKind::Assign(deref, Rvalue::Use(x)))],
        vec![],
    );
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (_, errs) = collect(&func, &ctx);
    assert!(errs.is_empty());
}

/// `_5 = f(_3, _4);` with `f: fn(&'a u32, &'a u32) -> &'a u32`: one region
/// is minted for the call, both argument regions and the return region are
/// wired through it, and control flows to the successor.
#[test]
fn call_with_lifetime_threading() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let ref_u32 = ctx.intern_ty(Type::Ref(
        Region::EarlyBound(0),
        Mutability::Not,
        ctx.common.u32,
    ));
    let sig = FnSig {
        num_regions: 1,
        inputs: vec![ref_u32, ref_u32],
        output: ref_u32,
    };
    let fn_ty = ctx.intern_ty(Type::FnDef(sig));

    let mut db = db_with_return(&ctx);
    // The callable's region vector covers the signature's binder position
    // and the three reference positions.
    let callee = db.add(lvalue(PlaceKind::Variable, fn_ty, &[1, 2, 3, 4], true));
    let a = db.add(lvalue(PlaceKind::Variable, ref_u32, &[5], true));
    let b = db.add(lvalue(PlaceKind::Variable, ref_u32, &[6], true));
    let out = db.add(lvalue(PlaceKind::Variable, ref_u32, &[7], true));

    let call_block = BasicBlock::new(
        vec![stmt(StatementKind::Assign(
            out,
            Rvalue::Call(callee, vec![a, b]),
        ))],
        vec![BlockId::from(1)],
    );
    let ret_block = BasicBlock::new(vec![stmt(StatementKind::Return)], vec![]);
    let func = function(&mut ctx, db, vec![call_block, ret_block], &[0]);
    let (facts, errs) = collect(&func, &ctx);

    assert!(errs.is_empty());
    // The next free region after the place database is 8, and exactly one
    // region is minted for the call.
    let call_region = rid(8);
    assert_eq!(
        facts.subset_base,
        vec![
            (call_region, rid(5), mid(0, 0)),
            (call_region, rid(6), mid(0, 0)),
            (rid(7), call_region, mid(0, 0)),
        ]
    );
    // The call jumps to its successor.
    assert!(facts.cfg_edge.contains(&(start(0, 0), start(1, 0))));
    // And the return statement uses the return place.
    assert!(facts
        .var_used_at
        .contains(&(place::return_place(), mid(1, 0))));
}

/// A switch fans out to every successor, on top of its own Start -> Mid
/// edge.
#[test]
fn switch_fans_out() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let mut db = db_with_return(&ctx);
    let cond = db.add(lvalue(PlaceKind::Variable, ctx.common.bool, &[], true));

    let switch = BasicBlock::new(
        vec![stmt(StatementKind::Switch(cond))],
        vec![BlockId::from(1), BlockId::from(2)],
    );
    let then_block = BasicBlock::new(vec![stmt(StatementKind::Return)], vec![]);
    let else_block = BasicBlock::new(vec![stmt(StatementKind::Return)], vec![]);
    let func = function(&mut ctx, db, vec![switch, then_block, else_block], &[0]);
    let (facts, errs) = collect(&func, &ctx);

    assert!(errs.is_empty());
    assert_eq!(
        facts.cfg_edge,
        vec![
            (start(0, 0), mid(0, 0)),
            (start(0, 0), start(1, 0)),
            (start(0, 0), start(2, 0)),
            (start(1, 0), mid(1, 0)),
            (start(2, 0), mid(2, 0)),
        ]
    );
    // No duplicate edges.
    let mut edges = facts.cfg_edge.clone();
    edges.sort();
    edges.dedup();
    assert_eq!(edges.len(), facts.cfg_edge.len());
}

/// Statements within a block are chained Mid -> Start.
#[test]
fn statements_chain_within_a_block() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let mut db = db_with_return(&ctx);
    let x = db.add(lvalue(PlaceKind::Variable, ctx.common.i32, &[], true));
    let y = db.add(lvalue(PlaceKind::Variable, ctx.common.i32, &[], true));

    let block = BasicBlock::new(
        vec![
            stmt(StatementKind::StorageLive(x)),
            stmt(StatementKind::Assign(x, Rvalue::Use(y))),
            stmt(StatementKind::Return),
        ],
        vec![],
    );
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, _) = collect(&func, &ctx);

    assert_eq!(
        facts.cfg_edge,
        vec![
            (start(0, 0), mid(0, 0)),
            (mid(0, 0), start(0, 1)),
            (start(0, 1), mid(0, 1)),
            (mid(0, 1), start(0, 2)),
            (start(0, 2), mid(0, 2)),
        ]
    );
}

/// The place walk records roots and projection edges exactly once each.
#[test]
fn place_tree_completeness() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let ref_i32 = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ctx.common.i32));
    let mut db = db_with_return(&ctx);
    let r = db.add(lvalue(PlaceKind::Variable, ref_i32, &[1], true));
    let deref = db.add(lvalue(PlaceKind::Deref { parent: r }, ctx.common.i32, &[], true));
    let temp = db.add(lvalue(PlaceKind::Temporary, ctx.common.i32, &[], true));

    let block = BasicBlock::new(vec![stmt(StatementKind::Return)], vec![]);
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, _) = collect(&func, &ctx);

    assert_eq!(
        facts.path_is_var,
        vec![
            (place::return_place(), place::return_place()),
            (r, r),
            (temp, temp),
        ]
    );
    assert_eq!(facts.child_path, vec![(deref, r)]);
    assert_eq!(facts.use_of_var_derefs_origin, vec![(r, rid(1))]);
}

/// Dereferencing strips the reference's own region; the pointee's regions
/// are tied to the parent's at every CFG point.
#[test]
fn deref_constraints_at_all_points() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let ref_i32 = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ctx.common.i32));
    let ref_ref_i32 = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ref_i32));

    let mut db = db_with_return(&ctx);
    let outer = db.add(lvalue(PlaceKind::Variable, ref_ref_i32, &[1, 2], true));
    let deref = db.add(lvalue(PlaceKind::Deref { parent: outer }, ref_i32, &[3], true));

    let block = BasicBlock::new(vec![stmt(StatementKind::Return)], vec![]);
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, _) = collect(&func, &ctx);

    let _ = deref;
    // Covariant position, so one direction, at both points of the lone
    // statement.
    assert_eq!(
        facts.subset_base,
        vec![
            (rid(3), rid(2), start(0, 0)),
            (rid(3), rid(2), mid(0, 0)),
        ]
    );
}

/// Behind a unique reference the pointee position is invariant: the subset
/// appears in both directions at every point.
#[test]
fn deref_behind_unique_reference_is_invariant() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let ref_i32 = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ctx.common.i32));
    let ref_mut = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Mut, ref_i32));

    let mut db = db_with_return(&ctx);
    let outer = db.add(lvalue(PlaceKind::Variable, ref_mut, &[1, 2], true));
    let _deref = db.add(lvalue(PlaceKind::Deref { parent: outer }, ref_i32, &[3], true));

    let block = BasicBlock::new(vec![stmt(StatementKind::Return)], vec![]);
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, _) = collect(&func, &ctx);

    assert_eq!(
        facts.subset_base,
        vec![
            (rid(3), rid(2), start(0, 0)),
            (rid(2), rid(3), start(0, 0)),
            (rid(3), rid(2), mid(0, 0)),
            (rid(2), rid(3), mid(0, 0)),
        ]
    );
}

/// Field projections remap the parent's regions through the definition and
/// constrain at every point; an invariant position constrains both ways.
#[test]
fn field_variance_application() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    // struct S<'a, 'b> { r: &'a mut &'b i32 } -- 'b sits in an invariant
    // position, 'a in a covariant one.
    let field_inner = ctx.intern_ty(Type::Ref(
        Region::EarlyBound(1),
        Mutability::Not,
        ctx.common.i32,
    ));
    let field_ty = ctx.intern_ty(Type::Ref(Region::EarlyBound(0), Mutability::Mut, field_inner));
    let s_name = ctx.intern_symb("S");
    let r_name = ctx.intern_symb("r");
    let adt = ctx.adts.insert(AdtDef {
        def_name: s_name,
        variants: vec![VariantDef {
            def_name: s_name,
            fields: vec![FieldDef {
                def_name: r_name,
                ty: field_ty,
            }],
        }],
        lifetime_variances: vec![Variance::Covariant, Variance::Invariant],
        type_variances: vec![],
        region_outlives: vec![],
        type_outlives: vec![],
    });
    let s_ty = ctx.intern_ty(Type::Adt(
        adt,
        Substs {
            regions: vec![Region::Anonymous, Region::Anonymous],
            types: vec![],
        },
    ));
    // The substituted type of the field place itself.
    let inst_inner = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ctx.common.i32));
    let inst_field = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Mut, inst_inner));

    let mut db = db_with_return(&ctx);
    let base = db.add(lvalue(PlaceKind::Variable, s_ty, &[1, 2], false));
    let field = db.add(lvalue(
        PlaceKind::Field {
            parent: base,
            variant: 0,
            field: 0,
        },
        inst_field,
        &[3, 4],
        false,
    ));

    let block = BasicBlock::new(vec![stmt(StatementKind::Return)], vec![]);
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, _) = collect(&func, &ctx);

    let _ = field;
    // Position 0 ('a, the reference's own lifetime) is covariant; position 1
    // ('b, behind `&mut`) is invariant. Each holds at both CFG points.
    let rows = &facts.subset_base;
    for &point in &[start(0, 0), mid(0, 0)] {
        assert!(rows.contains(&(rid(3), rid(1), point)));
        assert!(!rows.contains(&(rid(1), rid(3), point)));
        assert!(rows.contains(&(rid(4), rid(2), point)));
        assert!(rows.contains(&(rid(2), rid(4), point)));
    }
}

/// An aggregate initializer stamps the definition's outlives bounds onto
/// the fresh instance.
#[test]
fn initializer_applies_definition_bounds() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    // struct P<'a, 'b> where 'a: 'b -- no fields needed for the bound.
    let p_name = ctx.intern_symb("P");
    let adt = ctx.adts.insert(AdtDef {
        def_name: p_name,
        variants: vec![VariantDef {
            def_name: p_name,
            fields: vec![],
        }],
        lifetime_variances: vec![Variance::Covariant, Variance::Covariant],
        type_variances: vec![],
        region_outlives: vec![(0, 1)],
        type_outlives: vec![],
    });
    let p_ty = ctx.intern_ty(Type::Adt(
        adt,
        Substs {
            regions: vec![Region::Anonymous, Region::Anonymous],
            types: vec![],
        },
    ));

    let mut db = db_with_return(&ctx);
    let x = db.add(lvalue(PlaceKind::Variable, p_ty, &[1, 2], false));

    let block = BasicBlock::new(
        vec![stmt(StatementKind::Assign(x, Rvalue::Initializer(vec![])))],
        vec![],
    );
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, errs) = collect(&func, &ctx);

    assert!(errs.is_empty());
    assert!(facts.subset_base.contains(&(rid(1), rid(2), mid(0, 0))));
}

/// Initializing a reference forces everything behind it to outlive its own
/// lifetime.
#[test]
fn initializer_of_reference_orders_regions() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let ref_i32 = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ctx.common.i32));
    let ref_ref = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ref_i32));

    let mut db = db_with_return(&ctx);
    let x = db.add(lvalue(PlaceKind::Variable, ref_ref, &[1, 2], true));

    let block = BasicBlock::new(
        vec![stmt(StatementKind::Assign(x, Rvalue::Initializer(vec![])))],
        vec![],
    );
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, _) = collect(&func, &ctx);

    assert!(facts.subset_base.contains(&(rid(2), rid(1), mid(0, 0))));
}

/// A user ascription pins the place's regions against the named universal
/// regions; anonymous positions are ignored.
#[test]
fn user_type_ascription() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let ascribed = ctx.intern_ty(Type::Ref(
        Region::EarlyBound(1),
        Mutability::Not,
        ctx.common.i32,
    ));
    let anon = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ctx.common.i32));

    let mut db = db_with_return(&ctx);
    let r = db.add(lvalue(PlaceKind::Variable, anon, &[6], true));

    let block = BasicBlock::new(
        vec![stmt(StatementKind::AscribeUserType(r, ascribed))],
        vec![],
    );
    // Universal regions: 'static plus one lifetime parameter.
    let func = function(&mut ctx, db, vec![block], &[0, 5]);
    let (facts, errs) = collect(&func, &ctx);

    assert!(errs.is_empty());
    assert_eq!(facts.subset_base, vec![(rid(6), rid(5), mid(0, 0))]);
    assert_eq!(facts.universal_region, vec![rid(0), rid(5)]);
}

/// StorageLive defines; StorageDead redefines (the write form).
#[test]
fn storage_markers() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let mut db = db_with_return(&ctx);
    let x = db.add(lvalue(PlaceKind::Variable, ctx.common.i32, &[], true));

    let block = BasicBlock::new(
        vec![
            stmt(StatementKind::StorageLive(x)),
            stmt(StatementKind::StorageDead(x)),
        ],
        vec![],
    );
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, _) = collect(&func, &ctx);

    assert_eq!(
        facts.var_defined_at,
        vec![(x, mid(0, 0)), (x, mid(0, 1))]
    );
    assert_eq!(facts.path_assigned_at_base, vec![(x, mid(0, 1))]);
    assert!(facts.var_dropped_at.is_empty());
}

/// Known outlives pairs among universals surface as placeholder subsets.
#[test]
fn universal_region_bounds() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let db = db_with_return(&ctx);
    let block = BasicBlock::new(vec![stmt(StatementKind::Return)], vec![]);
    let mut func = function(&mut ctx, db, vec![block], &[0, 1, 2]);
    func.universal_region_bounds = vec![(rid(1), rid(2))];
    let (facts, _) = collect(&func, &ctx);

    assert_eq!(facts.universal_region, vec![rid(0), rid(1), rid(2)]);
    assert_eq!(facts.known_placeholder_subset, vec![(rid(1), rid(2))]);
}

/// Closures are reported and skipped.
#[test]
fn closures_are_skipped() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let db = db_with_return(&ctx);
    let block = BasicBlock::new(vec![stmt(StatementKind::Return)], vec![]);
    let mut func = function(&mut ctx, db, vec![block], &[0]);
    func.is_closure = true;

    let mut errs = ErrorBuf::new();
    let result = borrowck::check_function(&func, &ctx, &mut errs).unwrap();
    assert!(result.is_none());
    assert_eq!(errs.len(), 1);
}

/// An unsubstituted type parameter reaching constraint sanitization aborts
/// the function with a report.
#[test]
fn type_parameters_abort_sanitization() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let param = ctx.intern_ty(Type::Param(0));
    let mut db = db_with_return(&ctx);
    let x = db.add(lvalue(PlaceKind::Variable, param, &[], false));

    let block = BasicBlock::new(
        vec![stmt(StatementKind::Assign(x, Rvalue::Initializer(vec![])))],
        vec![],
    );
    let func = function(&mut ctx, db, vec![block], &[0]);

    let mut errs = ErrorBuf::new();
    let result = borrowck::check_function(&func, &ctx, &mut errs);
    assert!(result.is_err());
    assert_eq!(errs.len(), 1);
}

/// Running the collector twice over the same input produces byte-identical
/// dumps.
#[test]
fn deterministic_output() {
    fn build_and_dump() -> Vec<u8> {
        let conf = Config::default();
        let mut ctx = Context::new(&conf);

        let ref_i32 =
            ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ctx.common.i32));
        let mut db = db_with_return(&ctx);
        let x = db.add(lvalue(PlaceKind::Variable, ctx.common.i32, &[], true));
        let r = db.add(lvalue(PlaceKind::Variable, ref_i32, &[1], true));
        let deref = db.add(lvalue(PlaceKind::Deref { parent: r }, ctx.common.i32, &[], true));

        let block = BasicBlock::new(
            vec![
                stmt(StatementKind::Assign(
                    r,
                    Rvalue::Borrow(rid(1), LoanId::from(0), x),
                )),
                stmt(StatementKind::Assign(x, Rvalue::Use(deref))),
                stmt(StatementKind::Return),
            ],
            vec![],
        );
        let func = function(&mut ctx, db, vec![block], &[0]);
        let (facts, _) = collect(&func, &ctx);

        let mut out = Vec::new();
        dump_relation(&facts.cfg_edge, &mut out).unwrap();
        dump_relation(&facts.subset_base, &mut out).unwrap();
        dump_relation(&facts.var_used_at, &mut out).unwrap();
        dump_relation(&facts.loan_issued_at, &mut out).unwrap();
        dump_relation(&facts.path_is_var, &mut out).unwrap();
        out
    }

    assert_eq!(build_and_dump(), build_and_dump());
}

/// Assigning a reference flows its regions through the assignment under the
/// type's variance.
#[test]
fn assignment_wires_regions() {
    let conf = Config::default();
    let mut ctx = Context::new(&conf);

    let ref_i32 = ctx.intern_ty(Type::Ref(Region::Anonymous, Mutability::Not, ctx.common.i32));
    let mut db = db_with_return(&ctx);
    let a = db.add(lvalue(PlaceKind::Variable, ref_i32, &[1], true));
    let b = db.add(lvalue(PlaceKind::Variable, ref_i32, &[2], true));

    let block = BasicBlock::new(
        vec![stmt(StatementKind::Assign(a, Rvalue::Use(b)))],
        vec![],
    );
    let func = function(&mut ctx, db, vec![block], &[0]);
    let (facts, _) = collect(&func, &ctx);

    // Covariant: lhs into rhs, one direction only.
    assert_eq!(facts.subset_base, vec![(rid(1), rid(2), mid(0, 0))]);
}
