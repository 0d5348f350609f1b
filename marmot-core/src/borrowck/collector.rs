//! The fact collector: a single pass over a lowered function that emits the
//! input relations of the Polonius-style engine.
//!
//! Collection moves through three phases in a fixed order. Universal regions
//! are recorded first. Then the statement walk visits every statement of
//! every block exactly once, with a two-point (`Start`/`Mid`) cursor,
//! emitting control-flow edges, accesses, loans, and the outlives
//! constraints implied by assignments, calls, and ascriptions. The place
//! walk runs last: its structural constraints hold at *every* CFG point, so
//! it needs the point set the statement walk accumulated.

use log::debug;

use crate::bir::{BlockStore, Function, LoanId, Rvalue, Statement, StatementKind};
use crate::context::Context;
use crate::marmot_errors::{ErrorBuf, Maybe};
use crate::place::{self, Place, PlaceDb, PlaceId, PlaceKind};
use crate::regions::{static_region, FreeRegions, RegionId, RegionMint};
use crate::source::Span;
use crate::types::{Region, TyId, Type, Variance};

use super::facts::{Facts, Point, PointPosition};

pub struct FactCollector<'a> {
    facts: Facts,

    place_db: &'a PlaceDb,
    basic_blocks: &'a BlockStore,
    universal_regions: &'a [RegionId],
    universal_region_bounds: &'a [(RegionId, RegionId)],
    ctx: &'a Context<'a>,
    errs: &'a mut ErrorBuf,

    mint: RegionMint,
    current_bb: crate::bir::BlockId,
    current_stmt: u32,
    current_span: Span,
    /// Every Start and Mid point seen by the statement walk, for the
    /// all-points constraints of the place walk.
    cfg_points: Vec<Point>,
}

impl<'a> FactCollector<'a> {
    /// Run the collector over `func` and hand back the finished relations.
    /// Unsupported constructs abort with a buffered report; the two local
    /// access diagnostics are buffered without aborting.
    pub fn collect(func: &'a Function, ctx: &'a Context, errs: &'a mut ErrorBuf) -> Maybe<Facts> {
        let mut collector = Self::new(func, ctx, errs);
        debug!("collecting universal regions");
        collector.collect_universal_regions();
        debug!("walking statements");
        collector.visit_statements()?;
        debug!("walking the place tree");
        collector.collect_place_facts();
        Ok(collector.facts)
    }

    fn new(func: &'a Function, ctx: &'a Context, errs: &'a mut ErrorBuf) -> Self {
        // The mint must clear every region the producer handed out: the ones
        // on places, and the universals in case any is on no place at all.
        let mut seed = u32::from(func.peek_next_free_region());
        for &region in &func.universal_regions {
            seed = seed.max(u32::from(region) + 1);
        }

        Self {
            facts: Facts::default(),
            place_db: &func.place_db,
            basic_blocks: &func.basic_blocks,
            universal_regions: &func.universal_regions,
            universal_region_bounds: &func.universal_region_bounds,
            ctx,
            errs,
            mint: RegionMint::new(RegionId::from(seed)),
            current_bb: Default::default(),
            current_stmt: 0,
            current_span: Span::default(),
            cfg_points: Vec::new(),
        }
    }

    // === Phase 1: universal regions ===

    fn collect_universal_regions(&mut self) {
        self.facts
            .universal_region
            .extend_from_slice(self.universal_regions);
        self.facts
            .known_placeholder_subset
            .extend_from_slice(self.universal_region_bounds);
    }

    // === Phase 2: the statement walk ===

    fn visit_statements(&mut self) -> Maybe<()> {
        let blocks = self.basic_blocks;
        for (bb, block) in blocks.idx_enumerate() {
            self.current_bb = bb;
            for (n, stmt) in block.statements.iter().enumerate() {
                self.current_stmt = n as u32;
                self.current_span = stmt.span;
                self.add_stmt_to_cfg();
                self.visit_stmt(stmt)?;
            }
        }
        Ok(())
    }

    fn start_point(&self) -> Point {
        Point::new(self.current_bb, self.current_stmt, PointPosition::Start)
    }

    fn mid_point(&self) -> Point {
        Point::new(self.current_bb, self.current_stmt, PointPosition::Mid)
    }

    /// Each statement contributes its `Start -> Mid` edge; each non-first
    /// statement also connects the previous statement's `Mid` to its own
    /// `Start`.
    fn add_stmt_to_cfg(&mut self) {
        if self.current_stmt != 0 {
            let prev = Point::new(
                self.current_bb,
                self.current_stmt - 1,
                PointPosition::Mid,
            );
            self.facts.cfg_edge.push((prev, self.start_point()));
        }
        let (start, mid) = (self.start_point(), self.mid_point());
        self.facts.cfg_edge.push((start, mid));
        self.cfg_points.push(start);
        self.cfg_points.push(mid);
    }

    /// Fan out from a terminator to the first point of every successor.
    fn issue_jumps(&mut self) {
        let blocks = self.basic_blocks;
        for &succ in blocks[self.current_bb].successors() {
            let target = Point::new(succ, 0, PointPosition::Start);
            self.facts.cfg_edge.push((self.start_point(), target));
        }
    }

    fn visit_stmt(&mut self, stmt: &Statement) -> Maybe<()> {
        match &stmt.kind {
            StatementKind::Assign(lhs, rhs) => {
                self.issue_write(*lhs);
                self.visit_rvalue(*lhs, rhs)?;
            }
            StatementKind::Switch(place) | StatementKind::Goto(place) => {
                self.issue_read(*place);
                self.issue_jumps();
            }
            StatementKind::Return => {
                let mid = self.mid_point();
                self.facts.var_used_at.push((place::return_place(), mid));
            }
            StatementKind::StorageLive(place) => {
                let mid = self.mid_point();
                self.facts.var_defined_at.push((*place, mid));
            }
            StatementKind::StorageDead(place) => {
                // Treated as a write: the redefinition is what kills loans of
                // the dead variable downstream.
                self.issue_write(*place);
            }
            StatementKind::AscribeUserType(place, ty) => {
                self.ascribe_user_type(*place, *ty);
            }
        }
        Ok(())
    }

    fn visit_rvalue(&mut self, lhs: PlaceId, rvalue: &Rvalue) -> Maybe<()> {
        match rvalue {
            Rvalue::Initializer(values) => {
                self.sanitize_constraints_at_init(lhs)?;
                for &value in values {
                    self.issue_read(value);
                }
            }
            Rvalue::Unary(op) => self.issue_read(*op),
            Rvalue::Binary(lop, rop) => {
                self.issue_read(*lop);
                self.issue_read(*rop);
            }
            Rvalue::Borrow(origin, loan, base) => {
                self.visit_borrow(lhs, *origin, *loan, *base);
            }
            Rvalue::Use(rhs) => {
                self.issue_read(*rhs);
                // Wire the flow of lifetimes through the assignment. A
                // discarded result constrains nothing.
                let db = self.place_db;
                let (lhs_place, rhs_place) = (&db[lhs], &db[*rhs]);
                if !matches!(lhs_place.kind, PlaceKind::Invalid) {
                    self.push_subset(lhs_place.ty, &lhs_place.regions, &rhs_place.regions);
                }
            }
            Rvalue::Call(callable, args) => self.visit_call(lhs, *callable, args)?,
        }
        Ok(())
    }

    fn visit_borrow(&mut self, lhs: PlaceId, origin: RegionId, loan: LoanId, base: PlaceId) {
        let db = self.place_db;
        let mid = self.mid_point();
        self.facts.loan_issued_at.push((origin, loan, mid));

        // The borrow reads its base, but never moves it.
        self.read_place_rows(base);

        let lhs_place = &db[lhs];
        if matches!(lhs_place.kind, PlaceKind::Invalid) {
            // A discarded reference still issues its loan, but there is no
            // region to constrain.
            return;
        }
        assert!(
            lhs_place.regions.has_regions(),
            "borrow target must carry the reference's region"
        );
        // The borrowed data must outlive the reference.
        let loan_region = lhs_place.regions[0];
        for region in db[base].regions.iter() {
            self.facts.subset_base.push((region, loan_region, mid));
        }
    }

    fn visit_call(&mut self, lhs: PlaceId, callable: PlaceId, args: &[PlaceId]) -> Maybe<()> {
        let db = self.place_db;
        let ctx = self.ctx;

        self.issue_read(callable);
        let sig = match db[callable].ty.fn_sig(ctx) {
            Some(sig) => sig,
            None => unreachable!("call through a non-callable place"),
        };
        assert_eq!(args.len(), sig.inputs.len(), "call arity mismatch");

        // One fresh region per lifetime parameter of the callee; every
        // lifetime the signature mentions binds to one of these.
        let call_regions = self.mint.fresh_regions(sig.num_regions);

        for (n, &arg) in args.iter().enumerate() {
            self.issue_read(arg);
            let param_ty = sig.inputs[n];
            let bound = self.bind_regions(&param_ty.regions(ctx), &call_regions)?;
            self.push_subset(param_ty, &bound, &db[arg].regions);
        }

        if !matches!(db[lhs].kind, PlaceKind::Invalid) {
            let bound = self.bind_regions(&sig.output.regions(ctx), &call_regions)?;
            self.push_subset(sig.output, &db[lhs].regions, &bound);
        }

        self.issue_jumps();
        Ok(())
    }

    // === The access emitter ===

    /// The rows shared by every kind of read: the path access and, when the
    /// place sits under a variable, that variable's use.
    fn read_place_rows(&mut self, place_id: PlaceId) {
        let mid = self.mid_point();
        self.facts.path_accessed_at_base.push((place_id, mid));
        if let Some(var) = self.place_db.resolve_variable(place_id) {
            self.facts.var_used_at.push((var, mid));
        }
    }

    fn issue_read(&mut self, place_id: PlaceId) {
        let db = self.place_db;
        let place = &db[place_id];
        if matches!(place.kind, PlaceKind::Constant | PlaceKind::Invalid) {
            return;
        }

        self.read_place_rows(place_id);

        // A non-copy or rvalue operand is consumed by the read.
        if place.is_rvalue || !place.is_copy {
            let mid = self.mid_point();
            self.facts.path_moved_at_base.push((place_id, mid));
            for segment in db.path_segments(place_id) {
                if matches!(db[segment].kind, PlaceKind::Deref { .. }) {
                    self.errs.push(errors::MoveBehindReference {
                        span: self.current_span,
                    });
                }
            }
        }
    }

    fn issue_write(&mut self, place_id: PlaceId) {
        let db = self.place_db;
        let place = &db[place_id];
        // Assignment to `_`.
        if matches!(place.kind, PlaceKind::Invalid) {
            return;
        }
        assert!(
            place.is_lvalue || place.is_rvalue,
            "write target must be an lvalue or an rvalue"
        );

        let mid = self.mid_point();
        self.facts.path_assigned_at_base.push((place_id, mid));
        if matches!(place.kind, PlaceKind::Variable) {
            self.facts.var_defined_at.push((place_id, mid));
        } else if let Some(var) = db.resolve_variable(place_id) {
            // Writing through a projection uses the variable under it.
            self.facts.var_used_at.push((var, mid));
        }

        for segment in db.path_segments(place_id) {
            if let PlaceKind::Deref { parent } = db[segment].kind {
                if let Type::Ref(_, mutbl, _) = &self.ctx.types[db[parent].ty] {
                    if !mutbl.is_mut() {
                        self.errs.push(errors::MutateThroughSharedRef {
                            span: self.current_span,
                        });
                    }
                }
            }
        }
    }

    // === The region binder and variance engine ===

    /// Map the type-level regions of a callee-side type to analysis regions,
    /// given the fresh regions minted for the call.
    fn bind_regions(
        &mut self,
        regions: &[Region],
        call_regions: &FreeRegions,
    ) -> Maybe<FreeRegions> {
        let mut bound = FreeRegions::new();
        for region in regions {
            match region {
                Region::EarlyBound(n) => bound.push(call_regions[*n]),
                Region::Static => bound.push(static_region()),
                Region::Anonymous => bound.push(self.mint.fresh()),
                Region::Named(_) => {
                    // Explicit lifetime arguments at call sites are an open
                    // question; report rather than guess.
                    return Err(self.errs.push(errors::Unsupported {
                        span: self.current_span,
                        what: "named regions in call bindings",
                    }));
                }
            }
        }
        Ok(bound)
    }

    fn push_subset_base(&mut self, sup: RegionId, sub: RegionId, point: Point) {
        self.facts.subset_base.push((sup, sub, point));
    }

    fn apply_variance(&mut self, variance: Variance, pair: (RegionId, RegionId), point: Point) {
        let (lhs, rhs) = pair;
        match variance {
            Variance::Covariant => self.push_subset_base(lhs, rhs, point),
            Variance::Contravariant => self.push_subset_base(rhs, lhs, point),
            Variance::Invariant => {
                self.push_subset_base(lhs, rhs, point);
                self.push_subset_base(rhs, lhs, point);
            }
        }
    }

    /// The all-points form, used only for the structural constraints of the
    /// place walk, which must hold throughout the function.
    fn apply_variance_at_all_points(&mut self, variance: Variance, pair: (RegionId, RegionId)) {
        for n in 0..self.cfg_points.len() {
            let point = self.cfg_points[n];
            self.apply_variance(variance, pair, point);
        }
    }

    /// Emit the variance-directed subsets between two region vectors of the
    /// same type, at the current Mid.
    fn push_subset(&mut self, ty: TyId, lhs: &FreeRegions, rhs: &FreeRegions) {
        let variances = ty.variances(self.ctx);
        assert_eq!(
            variances.len(),
            lhs.len(),
            "region vector disagrees with the type's variance arity"
        );
        assert_eq!(
            variances.len(),
            rhs.len(),
            "region vector disagrees with the type's variance arity"
        );
        let mid = self.mid_point();
        for (n, &variance) in variances.iter().enumerate() {
            self.apply_variance(variance, (lhs[n], rhs[n]), mid);
        }
    }

    /// Stamp the type-level bounds of a freshly initialized place onto its
    /// regions.
    fn sanitize_constraints_at_init(&mut self, lhs: PlaceId) -> Maybe<()> {
        let db = self.place_db;
        let place = &db[lhs];
        if matches!(place.kind, PlaceKind::Invalid) {
            return Ok(());
        }

        self.sanitize_constraints(place.ty, 0, &place.regions)?;

        if let Type::Ref(..) = &self.ctx.types[place.ty] {
            // Everything behind the new reference outlives the reference's
            // own lifetime, which sits in the first slot.
            let own = place.regions[0];
            let mid = self.mid_point();
            for n in 1..place.regions.len() {
                self.push_subset_base(place.regions[n], own, mid);
            }
        }
        Ok(())
    }

    /// Recursive walk over a type that emits its type-level outlives
    /// constraints against the instance's region vector. `start` is the
    /// region slot the type's first position occupies; the walk returns the
    /// next unused slot.
    fn sanitize_constraints(
        &mut self,
        ty: TyId,
        start: usize,
        regions: &FreeRegions,
    ) -> Maybe<usize> {
        let ctx = self.ctx;
        match &ctx.types[ty] {
            Type::Adt(adt, substs) => {
                let def = &ctx.adts[*adt];
                let mut cursor = start + def.num_lifetime_params();

                // Each generic argument occupies the next flattened range.
                let mut arg_ranges = Vec::with_capacity(substs.types.len());
                for &arg in &substs.types {
                    let next = self.sanitize_constraints(arg, cursor, regions)?;
                    arg_ranges.push(cursor..next);
                    cursor = next;
                }

                let mid = self.mid_point();
                for &(sup, sub) in &def.region_outlives {
                    self.push_subset_base(regions[start + sup], regions[start + sub], mid);
                }
                for &(param, sub) in &def.type_outlives {
                    for slot in arg_ranges[param].clone() {
                        self.push_subset_base(regions[slot], regions[start + sub], mid);
                    }
                }
                Ok(cursor)
            }
            Type::FnDef(sig) | Type::FnPtr(sig) => {
                let mut cursor = start + sig.num_regions;
                for &input in &sig.inputs {
                    cursor = self.sanitize_constraints(input, cursor, regions)?;
                }
                self.sanitize_constraints(sig.output, cursor, regions)
            }
            Type::Ref(_, _, inner) => self.sanitize_constraints(*inner, start + 1, regions),
            Type::RawPtr(_, inner) | Type::Array(inner) | Type::Slice(inner) => {
                self.sanitize_constraints(*inner, start, regions)
            }
            Type::Tuple(tys) => {
                let mut cursor = start;
                for &elem in tys {
                    cursor = self.sanitize_constraints(elem, cursor, regions)?;
                }
                Ok(cursor)
            }
            Type::Bool
            | Type::Char
            | Type::Int(_)
            | Type::Uint(_)
            | Type::Str
            | Type::Never
            | Type::Dynamic
            | Type::Closure
            | Type::Error => Ok(start),
            Type::Param(_) | Type::Infer | Type::Placeholder => {
                Err(self.errs.push(errors::Unsupported {
                    span: self.current_span,
                    what: "unsubstituted types in constraint sanitization",
                }))
            }
        }
    }

    /// A user-written ascription pins the place's regions against the
    /// lifetimes the user named, under each position's variance.
    fn ascribe_user_type(&mut self, place_id: PlaceId, ty: TyId) {
        let ctx = self.ctx;
        let db = self.place_db;
        let place = &db[place_id];
        let user_regions = ty.regions(ctx);
        let variances = ty.variances(ctx);
        assert_eq!(
            user_regions.len(),
            place.regions.len(),
            "ascribed type disagrees with the place's region arity"
        );

        let mid = self.mid_point();
        for (n, region) in user_regions.iter().enumerate() {
            let origin = match region {
                Region::EarlyBound(k) => self.universal_regions[*k],
                Region::Static => static_region(),
                Region::Anonymous => continue,
                Region::Named(_) => {
                    unreachable!("unresolved named region in a user type ascription")
                }
            };
            self.apply_variance(variances[n], (place.regions[n], origin), mid);
        }
    }

    // === Phase 3: the place walk ===

    /// Emit the structural facts of the place tree: roots, parent edges, and
    /// the at-all-points subsets that tie projection regions to their
    /// parents'. Must run after the statement walk, which accumulates the
    /// point set.
    fn collect_place_facts(&mut self) {
        let db = self.place_db;
        for (id, place) in db.idx_enumerate() {
            match place.kind {
                PlaceKind::Variable | PlaceKind::Temporary => {
                    self.facts.path_is_var.push((id, id));
                    for region in place.regions.iter() {
                        self.facts.use_of_var_derefs_origin.push((id, region));
                    }
                    if !place.is_copy {
                        // Dropping the value also dereferences its origins.
                        for region in place.regions.iter() {
                            self.facts.drop_of_var_derefs_origin.push((id, region));
                        }
                    }
                }
                PlaceKind::Field {
                    parent,
                    variant,
                    field,
                } => {
                    self.facts.child_path.push((id, parent));
                    self.sanitize_field(place, parent, variant, field);
                }
                PlaceKind::Index { parent } => {
                    self.facts.child_path.push((id, parent));
                    let parent_place = &db[parent];
                    let variances = place.ty.variances(self.ctx);
                    debug_assert_eq!(place.regions.len(), parent_place.regions.len());
                    for n in 0..place.regions.len() {
                        self.apply_variance_at_all_points(
                            variances[n],
                            (place.regions[n], parent_place.regions[n]),
                        );
                    }
                }
                PlaceKind::Deref { parent } => {
                    self.facts.child_path.push((id, parent));
                    let parent_place = &db[parent];
                    // A reference's first region is its own lifetime; behind
                    // it, the pointee's regions remain. Raw pointers carry no
                    // region of their own. The parent's variances are the
                    // right ones here: a position behind `&mut` is invariant
                    // even where the pointee type alone reads covariant.
                    let skip = match &self.ctx.types[parent_place.ty] {
                        Type::Ref(..) => 1,
                        _ => 0,
                    };
                    debug_assert_eq!(place.regions.len() + skip, parent_place.regions.len());
                    let variances = parent_place.ty.variances(self.ctx);
                    for n in 0..place.regions.len() {
                        self.apply_variance_at_all_points(
                            variances[n + skip],
                            (place.regions[n], parent_place.regions[n + skip]),
                        );
                    }
                }
                PlaceKind::Constant | PlaceKind::Invalid => {}
            }
        }
    }

    fn sanitize_field(&mut self, place: &Place, parent: PlaceId, variant: usize, field: usize) {
        let db = self.place_db;
        let ctx = self.ctx;
        let parent_place = &db[parent];
        match &ctx.types[parent_place.ty] {
            // Tuple fields share their parent's regions directly; there is
            // no definition to consult.
            Type::Tuple(_) => {}
            Type::Adt(..) => {
                let mapped =
                    parent_place
                        .ty
                        .field_regions(variant, field, &parent_place.regions, ctx);
                let variances = place.ty.variances(ctx);
                debug_assert_eq!(mapped.len(), place.regions.len());
                for n in 0..place.regions.len() {
                    if let Some(bound) = mapped[n] {
                        self.apply_variance_at_all_points(
                            variances[n],
                            (place.regions[n], bound),
                        );
                    }
                }
            }
            Type::Error => {}
            _ => unreachable!("field projection on a non-aggregate type"),
        }
    }
}

mod errors {
    use crate::source::Span;
    use marmot_macros::Diagnostic;

    #[derive(Diagnostic)]
    #[msg = "Cannot move from behind a reference."]
    #[code = "E0507"]
    pub struct MoveBehindReference {
        #[span(msg = "the value is moved out through this path")]
        pub span: Span,
    }

    #[derive(Diagnostic)]
    #[msg = "Mutating content behind an immutable reference."]
    #[code = "E0596"]
    pub struct MutateThroughSharedRef {
        #[span(msg = "the write happens through this path")]
        pub span: Span,
    }

    #[derive(Diagnostic)]
    #[msg = "not implemented: {what}"]
    pub struct Unsupported {
        #[span]
        pub span: Span,
        pub what: &'static str,
    }
}
