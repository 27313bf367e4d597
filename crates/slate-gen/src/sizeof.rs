//! `sizeof(T)` (§4.4): field layout, stack allocation, and operand widths.
//!
//! Grounded on `original_source/src/includes/Generator/Generator.cpp`'s
//! `getSizeof`.

use slate_par::{Arena, DeclaredTypes, TypeId, TypeKind};

use crate::error::{CodeGenError, Result};

pub fn sizeof(arena: &Arena, declared_types: &DeclaredTypes, ty: TypeId) -> Result<u64> {
    let t = &arena.types[ty];
    match t.kind {
        TypeKind::Void => Err(CodeGenError::SizeError("Cannot get size of incomplete type".to_string())),
        TypeKind::Alias => match declared_types.get(&t.identifier) {
            Some(Some(target)) => sizeof(arena, declared_types, *target),
            Some(None) => Err(CodeGenError::SizeError(format!(
                "Cannot get size of '{}': forward declaration has no body",
                t.identifier
            ))),
            None => Err(CodeGenError::SizeError(format!("Unknown type '{}'", t.identifier))),
        },
        TypeKind::Boolean | TypeKind::Char | TypeKind::Byte => Ok(1),
        TypeKind::Float | TypeKind::Int | TypeKind::Uint => Ok(4),
        TypeKind::Double
        | TypeKind::Long
        | TypeKind::Ulong
        | TypeKind::Interface
        | TypeKind::Pointer
        | TypeKind::Str => Ok(8),
        TypeKind::Struct => {
            let mut acc = 0u64;
            for field in &t.fields {
                acc += sizeof(arena, declared_types, field.ty)?;
            }
            Ok(acc)
        }
        TypeKind::Union => {
            let mut max = 0u64;
            for field in &t.fields {
                max = max.max(sizeof(arena, declared_types, field.ty)?);
            }
            Ok(max)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slate_par::Type;

    #[test]
    fn scalar_sizes_match_the_table() {
        let mut arena = Arena::new();
        let declared = DeclaredTypes::new();
        let int_ty = arena.alloc_type(Type::scalar(TypeKind::Int));
        let long_ty = arena.alloc_type(Type::scalar(TypeKind::Long));
        let bool_ty = arena.alloc_type(Type::scalar(TypeKind::Boolean));
        assert_eq!(sizeof(&arena, &declared, int_ty).unwrap(), 4);
        assert_eq!(sizeof(&arena, &declared, long_ty).unwrap(), 8);
        assert_eq!(sizeof(&arena, &declared, bool_ty).unwrap(), 1);
    }

    #[test]
    fn struct_sums_fields_union_takes_max() {
        let mut arena = Arena::new();
        let declared = DeclaredTypes::new();
        let int_ty = arena.alloc_type(Type::scalar(TypeKind::Int));
        let long_ty = arena.alloc_type(Type::scalar(TypeKind::Long));

        let mut st = Type::scalar(TypeKind::Struct);
        st.fields = vec![
            slate_par::Variable { name: "a".into(), ty: int_ty },
            slate_par::Variable { name: "b".into(), ty: long_ty },
        ];
        let struct_ty = arena.alloc_type(st);
        assert_eq!(sizeof(&arena, &declared, struct_ty).unwrap(), 12);

        let mut un = Type::scalar(TypeKind::Union);
        un.fields = vec![
            slate_par::Variable { name: "a".into(), ty: int_ty },
            slate_par::Variable { name: "b".into(), ty: long_ty },
        ];
        let union_ty = arena.alloc_type(un);
        assert_eq!(sizeof(&arena, &declared, union_ty).unwrap(), 8);
    }

    #[test]
    fn void_fails_with_size_error() {
        let mut arena = Arena::new();
        let declared = DeclaredTypes::new();
        let void_ty = arena.alloc_type(Type::scalar(TypeKind::Void));
        assert!(sizeof(&arena, &declared, void_ty).is_err());
    }

    #[test]
    fn forward_declared_type_fails_with_size_error() {
        let mut arena = Arena::new();
        let mut declared = DeclaredTypes::new();
        declared.insert("S".to_string(), None);
        let mut alias = Type::scalar(TypeKind::Alias);
        alias.identifier = "S".to_string();
        let alias_ty = arena.alloc_type(alias);
        assert!(sizeof(&arena, &declared, alias_ty).is_err());
    }
}
