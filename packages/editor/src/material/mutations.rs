use futures::future::{FutureExt, LocalBoxFuture};

use crate::material::property::{ContinuousProperty, MaterialProperty};
use crate::material::{MaterialEditorView, MaterialPreview};
use crate::mutation_trait::{ContinuousMutation, Mutation, MutationResult, OneShotMutation};

/// Set one material property to a fixed value
#[derive(Debug, Clone)]
pub struct SetMaterialPropertyMutation<Prop: MaterialProperty> {
    pub property: Prop,
    pub value: Prop::Value,
}

impl<Prop: MaterialProperty> SetMaterialPropertyMutation<Prop> {
    pub fn new(property: Prop, value: Prop::Value) -> Self {
        Self { property, value }
    }
}

impl<P: MaterialPreview, Prop: MaterialProperty> Mutation<MaterialEditorView<P>> for SetMaterialPropertyMutation<Prop> {
    type Args = Prop::Value;

    fn description(&self) -> String {
        format!("Set material {}", self.property.label())
    }

    fn capture_undo_args(&self, view: &MaterialEditorView<P>) -> MutationResult<Prop::Value> {
        self.property.read(&view.state)
    }

    fn update(&self, view: &mut MaterialEditorView<P>, args: &Prop::Value) -> MutationResult<()> {
        self.property.write(&mut view.state, args)?;
        view.refresh_preview()?;
        Ok(())
    }

    fn write_document(&self, view: &mut MaterialEditorView<P>) -> MutationResult<()> {
        view.write_definition()
    }

    fn after_persist<'a>(&'a self, view: &'a mut MaterialEditorView<P>) -> LocalBoxFuture<'a, MutationResult<()>> {
        view.publish().boxed_local()
    }
}

impl<P: MaterialPreview, Prop: MaterialProperty> OneShotMutation<MaterialEditorView<P>>
    for SetMaterialPropertyMutation<Prop>
{
    fn args(&self) -> Prop::Value {
        self.value.clone()
    }
}

/// Drag a material property (a color picker, a strength slider). The
/// preview follows every update; the document is written on apply.
#[derive(Debug, Clone, Copy)]
pub struct DragMaterialPropertyMutation<Prop: ContinuousProperty> {
    pub property: Prop,
}

impl<Prop: ContinuousProperty> DragMaterialPropertyMutation<Prop> {
    pub fn new(property: Prop) -> Self {
        Self { property }
    }
}

impl<P: MaterialPreview, Prop: ContinuousProperty> Mutation<MaterialEditorView<P>>
    for DragMaterialPropertyMutation<Prop>
{
    type Args = Prop::Value;

    fn description(&self) -> String {
        format!("Set material {}", self.property.label())
    }

    fn capture_undo_args(&self, view: &MaterialEditorView<P>) -> MutationResult<Prop::Value> {
        self.property.read(&view.state)
    }

    fn update(&self, view: &mut MaterialEditorView<P>, args: &Prop::Value) -> MutationResult<()> {
        self.property.write(&mut view.state, args)?;
        view.refresh_preview()?;
        Ok(())
    }

    fn write_document(&self, view: &mut MaterialEditorView<P>) -> MutationResult<()> {
        view.write_definition()
    }

    fn after_persist<'a>(&'a self, view: &'a mut MaterialEditorView<P>) -> LocalBoxFuture<'a, MutationResult<()>> {
        view.publish().boxed_local()
    }
}

impl<P: MaterialPreview, Prop: ContinuousProperty> ContinuousMutation<MaterialEditorView<P>>
    for DragMaterialPropertyMutation<Prop>
{
}
