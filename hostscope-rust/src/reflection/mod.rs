//! Typed member accessors
//!
//! An accessor binds a (owning type, member name, visibility class) triple to
//! a host member handle once, then reads, writes or invokes it with the result
//! type chosen at the call site. Resolution failures are hard errors; type
//! mismatches surface as [`Error::InvalidCast`] when the accessor is used.

use crate::host::{
    FieldHandle, FromValue, HostRuntime, IntoValue, MethodHandle, MethodLookup, MethodQuery,
    ObjectRef, TypeInfo, Value, Visibility,
};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod slots;

pub use slots::{InvokeMethodSlots, InvokeMethodTask, MAX_PARAMETERS};

/// A resolved field
#[derive(Debug)]
pub struct FieldDescriptor {
    /// Full name of the owning type
    pub owner: String,
    /// Field name
    pub name: String,
    /// Visibility class it was found under
    pub visibility: Visibility,
    /// Declared field type
    pub type_name: String,
    handle: FieldHandle,
}

/// A resolved method
#[derive(Debug)]
pub struct MethodDescriptor {
    /// Full name of the owning type
    pub owner: String,
    /// Signature that was matched
    pub signature: MethodQuery,
    /// Declared visibility of the matched method
    pub visibility: Visibility,
    /// Declared return type
    pub return_type: String,
    handle: MethodHandle,
}

/// Receiver to pass to the host, checked against the member's visibility class
fn receiver(member: &str, visibility: Visibility, instance: Option<ObjectRef>) -> Result<Option<ObjectRef>> {
    match (visibility.is_static(), instance) {
        (true, Some(_)) => Err(Error::UnexpectedInstance {
            member: member.to_string(),
        }),
        (false, None) => Err(Error::MissingInstance {
            member: member.to_string(),
        }),
        (_, instance) => Ok(instance),
    }
}

/// Typed get/set access to one field
pub struct FieldAccessor<T> {
    descriptor: Arc<FieldDescriptor>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FieldAccessor<T> {
    /// The resolved member
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }
}

impl<T: FromValue> FieldAccessor<T> {
    /// Read the field; `instance` is `None` for static fields
    pub fn get<H>(&self, host: &H, instance: Option<ObjectRef>) -> Result<T>
    where
        H: HostRuntime + ?Sized,
    {
        let d = &self.descriptor;
        let target = receiver(&d.name, d.visibility, instance)?;
        T::from_value(host.get_field(d.handle, target)?)
    }
}

impl<T: IntoValue> FieldAccessor<T> {
    /// Write the field; `instance` is `None` for static fields
    pub fn set<H>(&self, host: &H, instance: Option<ObjectRef>, value: T) -> Result<()>
    where
        H: HostRuntime + ?Sized,
    {
        let d = &self.descriptor;
        let target = receiver(&d.name, d.visibility, instance)?;
        host.set_field(d.handle, target, value.into_value())?;
        Ok(())
    }
}

impl<T> Clone for FieldAccessor<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for FieldAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldAccessor").field(&self.descriptor).finish()
    }
}

/// Typed invocation of one method
pub struct MethodAccessor<R> {
    descriptor: Arc<MethodDescriptor>,
    _marker: PhantomData<fn() -> R>,
}

impl<R> MethodAccessor<R> {
    /// The resolved member
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }
}

impl<R: FromValue> MethodAccessor<R> {
    /// Invoke with positional arguments; `instance` is `None` for static methods
    pub fn invoke<H>(&self, host: &H, instance: Option<ObjectRef>, args: Vec<Value>) -> Result<R>
    where
        H: HostRuntime + ?Sized,
    {
        let d = &self.descriptor;
        let target = receiver(&d.signature.name, d.visibility, instance)?;
        R::from_value(host.invoke(d.handle, target, args)?)
    }
}

impl<R> Clone for MethodAccessor<R> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            _marker: PhantomData,
        }
    }
}

impl<R> fmt::Debug for MethodAccessor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MethodAccessor").field(&self.descriptor).finish()
    }
}

/// Resolve a field on a known type without caching
pub fn resolve_field<T>(owner: &TypeInfo, name: &str, visibility: Visibility) -> Result<FieldAccessor<T>> {
    let field = owner
        .field(name, visibility)
        .ok_or_else(|| Error::MemberNotFound {
            owner: owner.full_name.clone(),
            member: name.to_string(),
            kind: "Field",
            visibility,
        })?;

    Ok(FieldAccessor {
        descriptor: Arc::new(FieldDescriptor {
            owner: owner.full_name.clone(),
            name: field.name.clone(),
            visibility,
            type_name: field.type_name.clone(),
            handle: field.handle,
        }),
        _marker: PhantomData,
    })
}

/// Resolve a method on a known type without caching
///
/// Uses the host's arity-aware lookup when it has one. Otherwise every
/// declared method is scanned, regardless of visibility class, and the first
/// structural match in declaration order wins.
pub fn resolve_method<R, H>(
    host: &H,
    owner: &TypeInfo,
    query: &MethodQuery,
    visibility: Visibility,
) -> Result<MethodAccessor<R>>
where
    H: HostRuntime + ?Sized,
{
    let found = match host.find_method(owner, query, visibility)? {
        MethodLookup::Found(handle) => owner.methods.iter().find(|m| m.handle == handle),
        MethodLookup::Missing => None,
        MethodLookup::Unsupported => {
            let mut candidates = owner.methods.iter().filter(|m| m.matches(query));
            let first = candidates.next();
            let others = candidates.count();
            if first.is_some() && others > 0 {
                warn!(
                    owner = %owner.full_name,
                    method = %query,
                    others,
                    "ambiguous overload, taking the first declared match"
                );
            }
            first
        }
    };

    let method = found.ok_or_else(|| Error::MemberNotFound {
        owner: owner.full_name.clone(),
        member: query.to_string(),
        kind: "Method",
        visibility,
    })?;

    Ok(MethodAccessor {
        descriptor: Arc::new(MethodDescriptor {
            owner: owner.full_name.clone(),
            signature: query.clone(),
            visibility: method.visibility,
            return_type: method.return_type.clone(),
            handle: method.handle,
        }),
        _marker: PhantomData,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FieldKey {
    owner: String,
    name: String,
    visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MethodKey {
    owner: String,
    query: MethodQuery,
    visibility: Visibility,
}

/// Lazy-once cache of resolved members
///
/// The first request for a member performs the host lookup; every later
/// request for the same key reuses the descriptor. Nothing is ever evicted:
/// the host's type layout does not change while attached. Failed lookups are
/// not cached.
#[derive(Debug, Default)]
pub struct AccessorResolver {
    fields: HashMap<FieldKey, Arc<FieldDescriptor>>,
    methods: HashMap<MethodKey, Arc<MethodDescriptor>>,
}

impl AccessorResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Field accessor for `owner.name` under `visibility`
    pub fn field<T, H>(
        &mut self,
        host: &H,
        owner: &str,
        name: &str,
        visibility: Visibility,
    ) -> Result<FieldAccessor<T>>
    where
        H: HostRuntime + ?Sized,
    {
        let key = FieldKey {
            owner: owner.to_string(),
            name: name.to_string(),
            visibility,
        };

        if let Some(descriptor) = self.fields.get(&key) {
            return Ok(FieldAccessor {
                descriptor: Arc::clone(descriptor),
                _marker: PhantomData,
            });
        }

        let ty = host.find_type(owner)?;
        let accessor = resolve_field::<T>(&ty, name, visibility)?;
        debug!(owner, field = name, %visibility, "resolved field");

        self.fields.insert(key, Arc::clone(&accessor.descriptor));
        Ok(accessor)
    }

    /// Method accessor for `owner.query` under `visibility`
    pub fn method<R, H>(
        &mut self,
        host: &H,
        owner: &str,
        query: MethodQuery,
        visibility: Visibility,
    ) -> Result<MethodAccessor<R>>
    where
        H: HostRuntime + ?Sized,
    {
        let key = MethodKey {
            owner: owner.to_string(),
            query,
            visibility,
        };

        if let Some(descriptor) = self.methods.get(&key) {
            return Ok(MethodAccessor {
                descriptor: Arc::clone(descriptor),
                _marker: PhantomData,
            });
        }

        let ty = host.find_type(owner)?;
        let accessor = resolve_method::<R, H>(host, &ty, &key.query, visibility)?;
        debug!(owner, method = %key.query, %visibility, "resolved method");

        self.methods.insert(key, Arc::clone(&accessor.descriptor));
        Ok(accessor)
    }

    /// Number of cached members
    pub fn len(&self) -> usize {
        self.fields.len() + self.methods.len()
    }

    /// Whether nothing has been resolved yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{MethodBody, MockHost, MockType};
    use crate::host::HostError;

    const ENEMY: &str = "Game.Enemy";

    fn enemy_host() -> (MockHost, ObjectRef) {
        let host = MockHost::new();
        host.add_type(
            MockType::new(ENEMY)
                .field("health", Visibility::PrivateInstance, "System.Int32")
                .field("displayName", Visibility::PublicInstance, "System.String")
                .field("spawned", Visibility::PrivateStatic, "System.Int32")
                .method(
                    MethodQuery::new("GetName"),
                    Visibility::PublicInstance,
                    "System.String",
                    MethodBody::ReadsField("displayName".to_string()),
                )
                .method(
                    MethodQuery::new("Scale").parameters(["System.Int32"]),
                    Visibility::PrivateStatic,
                    "System.Int32",
                    MethodBody::Computes(Arc::new(|args| match args[0] {
                        Value::Int(v) => Value::Int(v * 10),
                        _ => Value::Null,
                    })),
                ),
        );
        let enemy = host.spawn(ENEMY, "Enemy");
        (host, enemy)
    }

    #[test]
    fn test_field_get_set() {
        let (host, enemy) = enemy_host();
        let mut resolver = AccessorResolver::new();

        let health = resolver
            .field::<i64, _>(&host, ENEMY, "health", Visibility::PrivateInstance)
            .unwrap();
        health.set(&host, Some(enemy), 75).unwrap();
        assert_eq!(health.get(&host, Some(enemy)).unwrap(), 75);
        assert_eq!(host.read_field(enemy, "health"), Value::Int(75));
    }

    #[test]
    fn test_static_field() {
        let (host, enemy) = enemy_host();
        let mut resolver = AccessorResolver::new();

        let spawned = resolver
            .field::<i64, _>(&host, ENEMY, "spawned", Visibility::PrivateStatic)
            .unwrap();
        spawned.set(&host, None, 3).unwrap();
        assert_eq!(spawned.get(&host, None).unwrap(), 3);

        assert!(matches!(
            spawned.get(&host, Some(enemy)),
            Err(Error::UnexpectedInstance { .. })
        ));
    }

    #[test]
    fn test_instance_field_without_instance() {
        let (host, _) = enemy_host();
        let mut resolver = AccessorResolver::new();

        let health = resolver
            .field::<i64, _>(&host, ENEMY, "health", Visibility::PrivateInstance)
            .unwrap();
        assert!(matches!(health.get(&host, None), Err(Error::MissingInstance { .. })));
    }

    #[test]
    fn test_member_not_found_at_resolution() {
        let (host, _) = enemy_host();
        let mut resolver = AccessorResolver::new();

        // Exists, but under another visibility class
        let err = resolver
            .field::<i64, _>(&host, ENEMY, "health", Visibility::PublicInstance)
            .unwrap_err();
        match err {
            Error::MemberNotFound { owner, member, kind, .. } => {
                assert_eq!(owner, ENEMY);
                assert_eq!(member, "health");
                assert_eq!(kind, "Field");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_unknown_owner_type() {
        let (host, _) = enemy_host();
        let mut resolver = AccessorResolver::new();

        let err = resolver
            .field::<i64, _>(&host, "Game.Missing", "x", Visibility::PublicInstance)
            .unwrap_err();
        assert!(matches!(err, Error::Host(HostError::TypeNotFound(_))));
    }

    #[test]
    fn test_invalid_cast_is_deferred_to_use() {
        let (host, enemy) = enemy_host();
        let mut resolver = AccessorResolver::new();

        // Wrong result type still resolves
        let health = resolver
            .field::<String, _>(&host, ENEMY, "health", Visibility::PrivateInstance)
            .unwrap();
        host.write_field(enemy, "health", Value::Int(10));

        assert!(matches!(
            health.get(&host, Some(enemy)),
            Err(Error::InvalidCast { expected: "string", actual: "int" })
        ));
    }

    #[test]
    fn test_resolution_is_cached() {
        let (host, _) = enemy_host();
        let mut resolver = AccessorResolver::new();

        resolver
            .field::<i64, _>(&host, ENEMY, "health", Visibility::PrivateInstance)
            .unwrap();
        resolver
            .field::<i64, _>(&host, ENEMY, "health", Visibility::PrivateInstance)
            .unwrap();
        resolver
            .method::<String, _>(&host, ENEMY, MethodQuery::new("GetName"), Visibility::PublicInstance)
            .unwrap();
        resolver
            .method::<String, _>(&host, ENEMY, MethodQuery::new("GetName"), Visibility::PublicInstance)
            .unwrap();

        assert_eq!(host.type_lookups(), 2);
        assert_eq!(resolver.len(), 2);
    }

    #[test]
    fn test_method_invoke() {
        let (host, enemy) = enemy_host();
        let mut resolver = AccessorResolver::new();
        host.write_field(enemy, "displayName", Value::Str("Grunt".into()));

        let get_name = resolver
            .method::<String, _>(&host, ENEMY, MethodQuery::new("GetName"), Visibility::PublicInstance)
            .unwrap();
        assert_eq!(get_name.invoke(&host, Some(enemy), vec![]).unwrap(), "Grunt");

        let scale = resolver
            .method::<i64, _>(
                &host,
                ENEMY,
                MethodQuery::new("Scale").parameters(["System.Int32"]),
                Visibility::PrivateStatic,
            )
            .unwrap();
        assert_eq!(scale.invoke(&host, None, vec![Value::Int(4)]).unwrap(), 40);
    }

    #[test]
    fn test_method_signature_must_match() {
        let (host, _) = enemy_host();
        let mut resolver = AccessorResolver::new();

        let err = resolver
            .method::<i64, _>(
                &host,
                ENEMY,
                MethodQuery::new("Scale").parameters(["System.Single"]),
                Visibility::PrivateStatic,
            )
            .unwrap_err();
        match err {
            Error::MemberNotFound { member, kind, .. } => {
                assert_eq!(member, "Scale(System.Single)");
                assert_eq!(kind, "Method");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fallback_scan_ignores_visibility_and_takes_first_match() {
        let host = MockHost::new();
        let ty = host.add_type(
            MockType::new("Game.Bus")
                .method(
                    MethodQuery::new("Send").generic_arity(1).parameters(["System.String"]),
                    Visibility::PrivateInstance,
                    "System.Int32",
                    MethodBody::Computes(Arc::new(|_| Value::Int(1))),
                )
                .method(
                    MethodQuery::new("Send").generic_arity(1).parameters(["System.String"]),
                    Visibility::PublicInstance,
                    "System.Int32",
                    MethodBody::Computes(Arc::new(|_| Value::Int(2))),
                ),
        );
        let query = MethodQuery::new("Send").generic_arity(1).parameters(["System.String"]);

        let send = resolve_method::<i64, _>(&host, &ty, &query, Visibility::PublicInstance).unwrap();
        assert_eq!(send.descriptor().visibility, Visibility::PrivateInstance);

        let bus = host.spawn("Game.Bus", "Bus");
        assert_eq!(send.invoke(&host, Some(bus), vec![Value::Str("hi".into())]).unwrap(), 1);
    }

    #[test]
    fn test_arity_aware_lookup_respects_visibility() {
        let host = MockHost::new().with_arity_lookup(true);
        let ty = host.add_type(
            MockType::new("Game.Bus")
                .method(
                    MethodQuery::new("Send").parameters(["System.String"]),
                    Visibility::PrivateInstance,
                    "System.Int32",
                    MethodBody::Computes(Arc::new(|_| Value::Int(1))),
                )
                .method(
                    MethodQuery::new("Send").parameters(["System.String"]),
                    Visibility::PublicInstance,
                    "System.Int32",
                    MethodBody::Computes(Arc::new(|_| Value::Int(2))),
                ),
        );
        let query = MethodQuery::new("Send").parameters(["System.String"]);

        let send = resolve_method::<i64, _>(&host, &ty, &query, Visibility::PublicInstance).unwrap();
        assert_eq!(send.descriptor().visibility, Visibility::PublicInstance);

        let none = resolve_method::<i64, _>(&host, &ty, &query, Visibility::PublicStatic);
        assert!(matches!(none, Err(Error::MemberNotFound { .. })));
    }
}
