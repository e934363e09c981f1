use proc_macro_error2::abort;
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Meta, Token, Type, spanned::Spanned};

/// Configuration parsed from `#[entity(...)]` attributes
#[derive(Default)]
struct EntityConfig {
    table: Option<String>,
    updatable: Option<Span>,
    restorable: Option<Span>,
    standing_data: Option<Span>,
}

/// How a struct field takes part in persistence
enum FieldRole {
    Model,
    Embed,
    Column { name: String, annotation: String },
}

struct MappedField<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    role: FieldRole,
}

/// One argument inside `#[orm(...)]`
enum OrmArg {
    Model(Span),
    Embed(Span),
    Annotation(LitStr),
    Column(LitStr),
}

impl Parse for OrmArg {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitStr) {
            return input.parse().map(OrmArg::Annotation);
        }
        let ident = Ident::parse_any(input)?;
        match ident.to_string().as_str() {
            "model" => Ok(OrmArg::Model(ident.span())),
            "embed" => Ok(OrmArg::Embed(ident.span())),
            "column" => {
                input.parse::<Token![=]>()?;
                input.parse().map(OrmArg::Column)
            }
            other => Err(syn::Error::new(
                ident.span(),
                format!("orm: unknown argument `{other}`, expected `model`, `embed`, `column = \"...\"` or an annotation string"),
            )),
        }
    }
}

#[allow(clippy::needless_pass_by_value)] // DeriveInput is consumed by proc-macro pattern
pub fn expand_derive_entity(input: DeriveInput) -> TokenStream {
    let config = parse_entity_attrs(&input);
    let fields = mapped_fields(&input, "Entity");

    let mut models = fields.iter().filter(|f| matches!(f.role, FieldRole::Model));
    let Some(model) = models.next() else {
        abort!(
            input.ident.span(),
            "#[derive(Entity)] requires one field marked #[orm(model)]"
        );
    };
    if let Some(extra) = models.next() {
        abort!(extra.ident.span(), "duplicate #[orm(model)] field");
    }

    let ident = &input.ident;
    let model_ident = model.ident;
    let table = config.table.unwrap_or_else(|| ident.unraw().to_string());
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields_impl = fields_impl(&input, &fields);

    let updatable_impl = config.updatable.map(|span| {
        quote::quote_spanned! {span=>
            fn as_updatable(&self) -> ::core::option::Option<&dyn ::modkit_orm::Updatable> {
                ::core::option::Option::Some(self)
            }
        }
    });
    let restorable_impl = config.restorable.map(|span| {
        quote::quote_spanned! {span=>
            fn as_restorable(&mut self) -> ::core::option::Option<&mut dyn ::modkit_orm::Restorable> {
                ::core::option::Option::Some(self)
            }
        }
    });
    let standing_data_impl = config.standing_data.map(|span| {
        quote::quote_spanned! {span=>
            fn standing_data() -> ::std::vec::Vec<Self> {
                <Self as ::modkit_orm::StandingData>::standing_data()
            }
        }
    });

    // Generic entities are checked when their descriptors are built instead.
    let distinct_columns = input.generics.params.is_empty().then(|| {
        quote! {
            const _: () = <#ident as ::modkit_orm::schema::Fields>::COLUMNS.assert_distinct();
        }
    });

    quote! {
        #fields_impl

        #distinct_columns

        impl #impl_generics ::modkit_orm::schema::Entity for #ident #ty_generics #where_clause {
            const TABLE: &'static str = #table;

            fn model(&self) -> &::modkit_orm::Model {
                &self.#model_ident
            }

            fn model_mut(&mut self) -> &mut ::modkit_orm::Model {
                &mut self.#model_ident
            }

            #updatable_impl

            #restorable_impl

            #standing_data_impl
        }
    }
}

#[allow(clippy::needless_pass_by_value)] // DeriveInput is consumed by proc-macro pattern
pub fn expand_derive_fields(input: DeriveInput) -> TokenStream {
    if let Some(attr) = input.attrs.iter().find(|a| a.path().is_ident("entity")) {
        abort!(
            attr.span(),
            "#[entity(...)] belongs on #[derive(Entity)] structs"
        );
    }
    let fields = mapped_fields(&input, "Fields");
    if let Some(model) = fields.iter().find(|f| matches!(f.role, FieldRole::Model)) {
        abort!(
            model.ident.span(),
            "#[orm(model)] is only allowed in #[derive(Entity)] structs"
        );
    }
    fields_impl(&input, &fields)
}

/// Generate the `Fields` implementation shared by both derives
fn fields_impl(input: &DeriveInput, fields: &[MappedField<'_>]) -> TokenStream {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut describe = Vec::new();
    let mut values = Vec::new();
    let mut assign = Vec::new();
    let mut own_columns = Vec::new();
    let mut embedded_columns = Vec::new();

    for field in fields {
        let field_ident = field.ident;
        let ty = field.ty;
        match &field.role {
            FieldRole::Model => {}
            FieldRole::Embed => {
                embedded_columns.push(quote! {
                    &<#ty as ::modkit_orm::Fields>::COLUMNS
                });
                describe.push(quote! {
                    <#ty as ::modkit_orm::Fields>::describe(out);
                });
                values.push(quote! {
                    ::modkit_orm::Fields::values(&self.#field_ident, out);
                });
                assign.push(quote! {
                    if ::modkit_orm::Fields::assign(&mut self.#field_ident, column, cell) {
                        return true;
                    }
                });
            }
            FieldRole::Column { name, annotation } => {
                own_columns.push(name);
                describe.push(quote! {
                    out.push(::modkit_orm::FieldDescriptor::from_annotation(
                        #name,
                        #annotation,
                        <#ty as ::modkit_orm::Column>::FIELD_TYPE,
                        <#ty as ::modkit_orm::Column>::UNSIGNED,
                        <#ty as ::modkit_orm::Column>::NULLABLE,
                    ));
                });
                values.push(quote! {
                    out.push((#name, ::modkit_orm::Column::to_value(&self.#field_ident)));
                });
                assign.push(quote! {
                    if column.eq_ignore_ascii_case(#name) {
                        if let ::core::option::Option::Some(value) =
                            <#ty as ::modkit_orm::Column>::from_cell(cell)
                        {
                            self.#field_ident = value;
                        }
                        return true;
                    }
                });
            }
        }
    }

    quote! {
        impl #impl_generics ::modkit_orm::schema::Fields for #ident #ty_generics #where_clause {
            const COLUMNS: ::modkit_orm::schema::ColumnSet = ::modkit_orm::schema::ColumnSet {
                own: &[#(#own_columns),*],
                embedded: &[#(#embedded_columns),*],
            };

            fn describe(out: &mut ::std::vec::Vec<::modkit_orm::FieldDescriptor>) {
                #(#describe)*
            }

            fn values(&self, out: &mut ::std::vec::Vec<(&'static str, ::modkit_orm::Value)>) {
                #(#values)*
            }

            fn assign(
                &mut self,
                column: &str,
                cell: ::core::option::Option<&str>,
            ) -> bool {
                #(#assign)*
                let _ = (column, cell);
                false
            }
        }
    }
}

/// Collect the `#[orm]` fields of a named-field struct
fn mapped_fields<'a>(input: &'a DeriveInput, derive: &str) -> Vec<MappedField<'a>> {
    let Data::Struct(data) = &input.data else {
        abort!(
            input.ident.span(),
            "#[derive({})] can only be applied to structs",
            derive
        );
    };
    let Fields::Named(named) = &data.fields else {
        abort!(
            input.ident.span(),
            "#[derive({})] requires a struct with named fields",
            derive
        );
    };

    let mut out: Vec<MappedField<'a>> = Vec::new();
    for field in &named.named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let Some(role) = field_role(field, ident) else {
            continue;
        };
        if let FieldRole::Column { name, .. } = &role {
            let taken = out.iter().any(|f| match &f.role {
                FieldRole::Column { name: other, .. } => other.eq_ignore_ascii_case(name),
                _ => false,
            });
            if taken || is_reserved(name) {
                abort!(ident.span(), "orm: duplicate or reserved column name `{}`", name);
            }
        }
        out.push(MappedField {
            ident,
            ty: &field.ty,
            role,
        });
    }
    out
}

/// Role of one field, `None` when it carries no `#[orm]` attribute
fn field_role(field: &syn::Field, ident: &Ident) -> Option<FieldRole> {
    let mut attrs = field.attrs.iter().filter(|a| a.path().is_ident("orm"));
    let attr = attrs.next()?;
    if let Some(dup) = attrs.next() {
        abort!(dup.span(), "duplicate #[orm] attribute");
    }

    let args = match &attr.meta {
        Meta::Path(_) => Vec::new(),
        Meta::List(_) => match attr.parse_args_with(Punctuated::<OrmArg, Token![,]>::parse_terminated) {
            Ok(args) => args.into_iter().collect(),
            Err(e) => abort!(e.span(), "{}", e),
        },
        Meta::NameValue(nv) => abort!(nv.span(), "expected #[orm] or #[orm(...)]"),
    };

    let mut model = None;
    let mut embed = None;
    let mut annotation: Option<LitStr> = None;
    let mut column: Option<LitStr> = None;
    for arg in args {
        match arg {
            OrmArg::Model(span) if model.is_none() => model = Some(span),
            OrmArg::Embed(span) if embed.is_none() => embed = Some(span),
            OrmArg::Annotation(lit) if annotation.is_none() => annotation = Some(lit),
            OrmArg::Column(lit) if column.is_none() => column = Some(lit),
            OrmArg::Model(span) | OrmArg::Embed(span) => abort!(span, "duplicate orm argument"),
            OrmArg::Annotation(lit) | OrmArg::Column(lit) => {
                abort!(lit.span(), "duplicate orm argument");
            }
        }
    }

    match (model, embed) {
        (Some(span), Some(_)) => abort!(span, "orm: `model` and `embed` are exclusive"),
        (Some(span), None) | (None, Some(span)) if annotation.is_some() || column.is_some() => {
            abort!(span, "orm: `model` and `embed` take no annotation or column name");
        }
        (Some(_), None) => Some(FieldRole::Model),
        (None, Some(_)) => Some(FieldRole::Embed),
        (None, None) => {
            let name = column.map_or_else(|| ident.unraw().to_string(), |c| c.value());
            if name.trim().is_empty() {
                abort!(ident.span(), "orm: column name cannot be empty");
            }
            Some(FieldRole::Column {
                name,
                annotation: annotation.map(|a| a.value()).unwrap_or_default(),
            })
        }
    }
}

/// Parse all `#[entity(...)]` attributes with duplicate detection
fn parse_entity_attrs(input: &DeriveInput) -> EntityConfig {
    let mut config = EntityConfig::default();

    for attr in &input.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        let result = attr.parse_nested_meta(|meta| {
            let span = meta.path.span();
            let flag = if meta.path.is_ident("updatable") {
                &mut config.updatable
            } else if meta.path.is_ident("restorable") {
                &mut config.restorable
            } else if meta.path.is_ident("standing_data") {
                &mut config.standing_data
            } else if meta.path.is_ident("table") {
                if config.table.is_some() {
                    abort!(span, "duplicate attribute 'table'");
                }
                let value: LitStr = match meta.value() {
                    Ok(v) => match v.parse() {
                        Ok(lit) => lit,
                        Err(_) => abort!(span, "Expected string literal"),
                    },
                    Err(_) => abort!(span, "Expected '=' followed by a string value"),
                };
                if value.value().trim().is_empty() {
                    abort!(value.span(), "entity: table name cannot be empty");
                }
                config.table = Some(value.value());
                return Ok(());
            } else {
                let key = meta
                    .path
                    .get_ident()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                abort!(
                    span,
                    "entity: unknown attribute `{}`, expected `table`, `updatable`, `restorable` or `standing_data`",
                    key
                );
            };

            if flag.is_some() {
                abort!(span, "duplicate entity flag");
            }
            *flag = Some(span);
            Ok(())
        });

        if let Err(e) = result {
            abort!(e.span(), "{}", e);
        }
    }

    config
}

/// Bookkeeping columns supplied by the model
fn is_reserved(name: &str) -> bool {
    ["ID", "CreateDate", "LastUpdate", "DeleteDate"]
        .iter()
        .any(|r| r.eq_ignore_ascii_case(name))
}
