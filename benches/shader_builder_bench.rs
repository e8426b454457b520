use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use pso_cache::{
    AssetId, MaterialBlueprint, MaterialBlueprintResourceId, PipelineStateSignature,
    ShaderBlueprint, ShaderBlueprintResourceId, ShaderBuilder, ShaderProperties, ShaderPropertyId,
    ShaderResourceRegistry, ShaderType, VisualImportance,
};

const LIGHTING_SOURCE: &str = "\
@piece(LightLoop)
@foreach(NUM_LIGHTS, n)
    color += shade_light(lights[@n], normal);
@end
@end
@pset(NUM_LIGHTS, 4)
@property(NORMAL_MAP)
    normal = sample_normal(uv);
@else
    normal = vertex_normal;
@end
@insertpiece(LightLoop)
@property(SHADOWS && NUM_LIGHTS)
    color *= shadow_factor(@counter(SHADOW_SLOT));
@end
";

struct BenchMaterial {
    fragment: ShaderBlueprintResourceId,
}

impl MaterialBlueprint for BenchMaterial {
    fn id(&self) -> MaterialBlueprintResourceId {
        MaterialBlueprintResourceId::from_name("Bench/Material")
    }

    fn is_fully_loaded(&self) -> bool {
        true
    }

    fn shader_blueprint_resource_id(
        &self,
        shader_type: ShaderType,
    ) -> Option<ShaderBlueprintResourceId> {
        (shader_type == ShaderType::Fragment).then_some(self.fragment)
    }

    fn visual_importance_of_shader_property(&self, _id: ShaderPropertyId) -> VisualImportance {
        VisualImportance::Weight(0)
    }
}

fn bench_shader_builder(c: &mut Criterion) {
    let properties = ShaderProperties::from(&[("NORMAL_MAP", 1), ("SHADOWS", 1)][..]);
    let mut builder = ShaderBuilder::default();

    let mut group = c.benchmark_group("Shader Builder");

    group.bench_function("process lighting blueprint", |b| {
        b.iter(|| {
            let output = builder.process(black_box(LIGHTING_SOURCE), &properties);
            black_box(output);
        });
    });

    group.bench_function("referenced shader properties", |b| {
        b.iter(|| {
            black_box(ShaderBuilder::referenced_shader_properties(black_box(
                LIGHTING_SOURCE,
            )))
        });
    });

    group.finish();
}

fn bench_signature(c: &mut Criterion) {
    let fragment = ShaderBlueprintResourceId::from_name("Bench/Fragment");
    let mut resources = ShaderResourceRegistry::new();
    resources.insert_shader_blueprint(
        fragment,
        ShaderBlueprint::new(AssetId::from_name("bench.frag"), LIGHTING_SOURCE, &[]),
    );
    let material = BenchMaterial { fragment };
    let properties = ShaderProperties::from(
        &[("NORMAL_MAP", 1), ("SHADOWS", 1), ("UNUSED_A", 3), ("UNUSED_B", 7)][..],
    );

    let mut signature = PipelineStateSignature::default();
    c.bench_function("pipeline state signature", |b| {
        b.iter(|| {
            signature.set(&material, &resources, black_box(0xdead_beef), &properties);
            black_box(signature.pipeline_state_signature_id());
        });
    });
}

criterion_group!(benches, bench_shader_builder, bench_signature);
criterion_main!(benches);
