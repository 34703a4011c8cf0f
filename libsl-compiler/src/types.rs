use indexmap::IndexMap;

use crate::reference::TypeReference;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Simple {
        name: String,
    },
    /// A type of the implementation language, opaque to the library description.
    Real {
        name: String,
    },
    Array {
        element: TypeReference,
    },
    Enum {
        name: String,
        values: IndexMap<String, Option<i64>>,
    },
    EnumLikeSemantic {
        name: String,
        underlying: TypeReference,
        backing: TypeReference,
    },
    Structured {
        name: String,
        fields: IndexMap<String, TypeReference>,
    },
    Alias {
        name: String,
        original: TypeReference,
    },
}

impl Type {
    pub fn name(&self) -> String {
        match self {
            Type::Simple { name }
            | Type::Real { name }
            | Type::Enum { name, .. }
            | Type::EnumLikeSemantic { name, .. }
            | Type::Structured { name, .. }
            | Type::Alias { name, .. } => name.clone(),
            Type::Array { element } => format!("{}[]", element.name()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Type::Simple { name } => format!("simple type '{name}'"),
            Type::Real { name } => format!("real type '{name}'"),
            Type::Array { element } => format!("array of '{}'", element.name()),
            Type::Enum { name, .. } => format!("enum '{name}'"),
            Type::EnumLikeSemantic { name, .. } => format!("enum-like type '{name}'"),
            Type::Structured { name, .. } => format!("structured type '{name}'"),
            Type::Alias { name, original } => {
                format!("alias '{name}' of '{}'", original.name())
            }
        }
    }

    pub fn reference(&self) -> TypeReference {
        TypeReference::new(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasError {
    Unresolved(String),
    Cycle(String),
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, Type>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when a type with the same name already exists.
    pub fn insert(&mut self, ty: Type) -> bool {
        let name = ty.name();
        if self.types.contains_key(&name) {
            return false;
        }
        self.types.insert(name, ty);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Type> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Array types have no declaration of their own: the first mention of
    /// `T[]` registers it.
    pub fn intern_array(&mut self, element: TypeReference) -> TypeReference {
        let array = Type::Array { element };
        let reference = array.reference();
        if !self.types.contains_key(reference.name()) {
            self.types.insert(reference.name().to_string(), array);
        }
        reference
    }

    /// Follows alias links until a non-alias type is reached.
    pub fn unaliased<'a>(&'a self, ty: &'a Type) -> Result<&'a Type, AliasError> {
        let mut current = ty;
        let mut visited: Vec<String> = Vec::new();
        while let Type::Alias { name, original } = current {
            if visited.iter().any(|seen| seen == name) {
                return Err(AliasError::Cycle(name.clone()));
            }
            visited.push(name.clone());
            current = self
                .get(original.name())
                .ok_or_else(|| AliasError::Unresolved(original.name().to_string()))?;
        }
        Ok(current)
    }
}
