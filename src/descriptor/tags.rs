//! Element and attribute names of the job descriptor.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

macro_rules! vocabulary {
    ($(#[$meta:meta])* $name:ident, $table:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Exact, case-sensitive lookup of a name.
            pub fn from_name(name: &str) -> Option<$name> {
                $table.get(name).copied()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        static $table: Lazy<HashMap<&'static str, $name>> =
            Lazy::new(|| $name::ALL.iter().map(|v| (v.as_str(), *v)).collect());
    };
}

vocabulary!(
    /// Element names.
    XmlTag, TAGS {
        Job => "job",
        Variables => "variables",
        Variable => "variable",
        Description => "description",
        GenericInformation => "genericInformation",
        Info => "info",
        InputSpace => "inputSpace",
        OutputSpace => "outputSpace",
        GlobalSpace => "globalSpace",
        UserSpace => "userSpace",
        TaskFlow => "taskFlow",
        Task => "task",
        Depends => "depends",
        InputFiles => "inputFiles",
        OutputFiles => "outputFiles",
        Files => "files",
        Parallel => "parallel",
        Topology => "topology",
        Arbitrary => "arbitrary",
        BestProximity => "bestProximity",
        ThresholdProximity => "thresholdProximity",
        SingleHost => "singleHost",
        SingleHostExclusive => "singleHostExclusive",
        MultipleHostsExclusive => "multipleHostsExclusive",
        DifferentHostsExclusive => "differentHostsExclusive",
        Selection => "selection",
        Script => "script",
        Code => "code",
        File => "file",
        Arguments => "arguments",
        Argument => "argument",
        ForkEnvironment => "forkEnvironment",
        SystemEnvironment => "SystemEnvironment",
        JvmArgs => "jvmArgs",
        JvmArg => "jvmArg",
        AdditionalClasspath => "additionalClasspath",
        PathElement => "pathElement",
        EnvScript => "envScript",
        Pre => "pre",
        Post => "post",
        Cleaning => "cleaning",
        NativeExecutable => "nativeExecutable",
        StaticCommand => "staticCommand",
        ScriptExecutable => "scriptExecutable",
        ControlFlow => "controlFlow",
        If => "if",
        Loop => "loop",
        Replicate => "replicate",
        Metadata => "metadata",
        Visualization => "visualization",
    }
);

vocabulary!(
    /// Attribute names.
    XmlAttribute, ATTRIBUTES {
        Xmlns => "xmlns",
        XmlnsXsi => "xmlns:xsi",
        SchemaLocation => "xsi:schemaLocation",
        ProjectName => "projectName",
        Priority => "priority",
        OnTaskError => "onTaskError",
        MaxNumberOfExecution => "maxNumberOfExecution",
        Name => "name",
        RestartTaskOnError => "restartTaskOnError",
        TaskRetryDelay => "taskRetryDelay",
        Walltime => "walltime",
        RunAsMe => "runAsMe",
        Fork => "fork",
        PreciousResult => "preciousResult",
        PreciousLogs => "preciousLogs",
        Value => "value",
        Model => "model",
        Description => "description",
        Group => "group",
        Advanced => "advanced",
        Hidden => "hidden",
        Inherited => "inherited",
        Url => "url",
        Ref => "ref",
        Includes => "includes",
        Excludes => "excludes",
        AccessMode => "accessMode",
        NumberOfNodes => "numberOfNodes",
        Threshold => "threshold",
        Type => "type",
        Language => "language",
        WorkingDir => "workingDir",
        JavaHome => "javaHome",
        Path => "path",
        Block => "block",
        Target => "target",
        Else => "else",
        Continuation => "continuation",
    }
);

/// XML Schema instance namespace.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_tables() {
        assert_eq!(XmlTag::from_name("taskFlow"), Some(XmlTag::TaskFlow));
        assert_eq!(XmlTag::from_name("SystemEnvironment"), Some(XmlTag::SystemEnvironment));
        assert_eq!(XmlTag::from_name("taskflow"), None);
        assert_eq!(
            XmlAttribute::from_name("xsi:schemaLocation"),
            Some(XmlAttribute::SchemaLocation)
        );
    }

    #[test]
    fn test_names_are_unique() {
        let tags: std::collections::HashSet<_> = XmlTag::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(tags.len(), XmlTag::ALL.len());

        let attrs: std::collections::HashSet<_> =
            XmlAttribute::ALL.iter().map(|a| a.as_str()).collect();
        assert_eq!(attrs.len(), XmlAttribute::ALL.len());
    }

    #[test]
    fn test_display() {
        assert_eq!(XmlTag::NativeExecutable.to_string(), "nativeExecutable");
        assert_eq!(XmlAttribute::PreciousLogs.to_string(), "preciousLogs");
    }
}
